use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{MediaData, PlaybackStateData, SyncAction};

/// A playback mutation requested by a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Loads new media, stopping playback and rewinding to the start.
    Load(MediaData),
    /// Starts playback, optionally jumping to a position first.
    Play { current_time: Option<f64> },
    /// Stops playback, optionally recording the position it stopped at.
    Pause { current_time: Option<f64> },
    /// Moves the timeline without changing the play/pause state.
    Seek { current_time: f64 },
    /// The loaded media ran out. Rewinds, keeps the media loaded.
    Ended,
}

/// The durable fields a transition produces once applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub current_media: Option<MediaData>,
    pub playback_state: PlaybackStateData,
    /// Whether `current_media` differs from what was loaded before.
    pub media_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("playback time must be a finite, non-negative number of seconds")]
    InvalidTime,
    #[error("no media is loaded")]
    NoMedia,
}

impl Transition {
    pub fn action(&self) -> SyncAction {
        match self {
            Self::Load(_) => SyncAction::Load,
            Self::Play { .. } => SyncAction::Play,
            Self::Pause { .. } => SyncAction::Pause,
            Self::Seek { .. } => SyncAction::Seek,
            Self::Ended => SyncAction::Ended,
        }
    }

    /// The position supplied with the request, if any.
    pub fn current_time(&self) -> Option<f64> {
        match self {
            Self::Play { current_time } | Self::Pause { current_time } => *current_time,
            Self::Seek { current_time } => Some(*current_time),
            Self::Load(_) | Self::Ended => None,
        }
    }

    pub fn media(&self) -> Option<&MediaData> {
        match self {
            Self::Load(media) => Some(media),
            _ => None,
        }
    }
}

/// Validates and applies a transition against the current canonical state.
///
/// Pure: the resulting state depends only on the inputs, never on who asked.
/// Positions are not clamped against media duration; that is a client concern.
pub fn apply(
    current_media: Option<&MediaData>,
    state: &PlaybackStateData,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<Applied, PlaybackError> {
    if let Some(time) = transition.current_time() {
        if !time.is_finite() || time < 0. {
            return Err(PlaybackError::InvalidTime);
        }
    }

    // Everything except loading requires media to operate on
    if !matches!(transition, Transition::Load(_)) && current_media.is_none() {
        return Err(PlaybackError::NoMedia);
    }

    let mut media = current_media.cloned();
    let mut next = state.clone();

    match transition {
        Transition::Load(new_media) => {
            media = Some(new_media.clone());
            next.is_playing = false;
            next.current_time = 0.;
        }
        Transition::Play { current_time } => {
            next.is_playing = true;

            if let Some(time) = current_time {
                next.current_time = *time;
            }
        }
        Transition::Pause { current_time } => {
            next.is_playing = false;

            if let Some(time) = current_time {
                next.current_time = *time;
            }
        }
        Transition::Seek { current_time } => {
            next.current_time = *current_time;
        }
        Transition::Ended => {
            next.is_playing = false;
            next.current_time = 0.;
        }
    }

    next.last_updated = now;

    Ok(Applied {
        media_changed: matches!(transition, Transition::Load(_)),
        current_media: media,
        playback_state: next,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn media(id: &str) -> MediaData {
        MediaData {
            id: id.to_string(),
            title: "a film".to_string(),
            url: format!("https://media.example/{id}"),
            duration: Some(120.),
            thumbnail: None,
            kind: "movie".to_string(),
        }
    }

    fn apply_all(transitions: &[Transition]) -> (Option<MediaData>, PlaybackStateData) {
        apply_all_at(transitions, Utc::now())
    }

    fn apply_all_at(
        transitions: &[Transition],
        now: DateTime<Utc>,
    ) -> (Option<MediaData>, PlaybackStateData) {
        let mut media = None;
        let mut state = PlaybackStateData::default();

        for transition in transitions {
            let applied = apply(media.as_ref(), &state, transition, now).unwrap();
            media = applied.current_media;
            state = applied.playback_state;
        }

        (media, state)
    }

    #[test]
    fn load_resets_timeline() {
        let (media, state) = apply_all(&[
            Transition::Load(self::media("v1")),
            Transition::Play { current_time: None },
            Transition::Seek { current_time: 42. },
            Transition::Load(self::media("v2")),
        ]);

        assert_eq!(media.unwrap().id, "v2");
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 0.);
    }

    #[test]
    fn play_requires_media() {
        let result = apply(
            None,
            &PlaybackStateData::default(),
            &Transition::Play { current_time: None },
            Utc::now(),
        );

        assert_eq!(result, Err(PlaybackError::NoMedia));
    }

    #[test]
    fn rejects_invalid_times() {
        for time in [-1., f64::NAN, f64::INFINITY] {
            let result = apply(
                Some(&media("v1")),
                &PlaybackStateData::default(),
                &Transition::Seek { current_time: time },
                Utc::now(),
            );

            assert_eq!(result, Err(PlaybackError::InvalidTime));
        }
    }

    #[test]
    fn seek_preserves_play_state() {
        let (_, state) = apply_all(&[
            Transition::Load(media("v1")),
            Transition::Play { current_time: Some(5.) },
            Transition::Seek { current_time: 30. },
        ]);

        assert!(state.is_playing);
        assert_eq!(state.current_time, 30.);
    }

    #[test]
    fn pause_keeps_position_unless_supplied() {
        let (_, state) = apply_all(&[
            Transition::Load(media("v1")),
            Transition::Play { current_time: Some(10.) },
            Transition::Pause { current_time: None },
        ]);

        assert!(!state.is_playing);
        assert_eq!(state.current_time, 10.);
    }

    #[test]
    fn ended_rewinds_but_keeps_media() {
        let (media, state) = apply_all(&[
            Transition::Load(self::media("v1")),
            Transition::Play { current_time: Some(119.) },
            Transition::Ended,
        ]);

        assert_eq!(media.unwrap().id, "v1");
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 0.);
    }

    #[test]
    fn sequences_are_deterministic() {
        let now = Utc::now();
        let transitions = [
            Transition::Load(media("v1")),
            Transition::Play { current_time: Some(3.) },
            Transition::Pause { current_time: Some(7.) },
            Transition::Play { current_time: None },
            Transition::Seek { current_time: 99. },
        ];

        assert_eq!(
            apply_all_at(&transitions, now),
            apply_all_at(&transitions, now)
        );
    }
}
