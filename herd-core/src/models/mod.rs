pub mod caller;
pub mod drug;
pub mod livestock;
pub mod records;

pub use caller::{CallerRole, MembershipStatus};
pub use drug::Drug;
pub use livestock::Livestock;
pub use records::{AmuRecord, HealthRecord, UsageEvent};
