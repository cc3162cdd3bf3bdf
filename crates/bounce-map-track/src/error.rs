/// Errors raised while building a trajectory.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TrackError {
    #[error("frame {next} does not follow frame {previous}; observations must be strictly ascending")]
    OutOfOrder { previous: u64, next: u64 },
    #[error("observation at frame {frame} has a non-finite position or confidence")]
    NonFinite { frame: u64 },
}
