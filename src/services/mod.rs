pub mod diagnostics;
pub mod dom;
pub mod forbidden;
pub mod music;

pub use diagnostics::Diagnostics;
pub use dom::{Located, Tick};
pub use forbidden::ForbiddenFilter;
pub use music::MusicSelection;
