//! Session runner for the Johnston (1991) stereo shape distortion experiment: configuration,
//! trial sequencing, the binocular presentation loop, and trial data persistence around the
//! `rds` stereogram generator.

#[macro_use]
extern crate tracing;

pub mod display;
pub mod error;
pub mod headless;
pub mod lifecycle;
pub mod metrics;
pub mod record;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod trials;

pub use display::{Eye, Key, KeyPress, ResponseSource, StereoDisplay, StereoDots, StereoFrame};
pub use error::SessionError;
pub use lifecycle::{Lifecycle, SessionState};
pub use record::{DataLog, ResponseLabel, SessionInfo, TrialRecord};
pub use schedule::{FrameSchedule, RefreshRates};
pub use session::{Session, SessionOutcome};
pub use settings::SessionSettings;
pub use trials::{Trial, TrialPlan};
