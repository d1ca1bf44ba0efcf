//! Built-in insight rules. Each covers one narrative area and owns its
//! trigger conditions, copy, and confidence level.

mod capacity;
mod flight_plan;
mod funding;
mod growth;
mod network;
mod programs;

pub use capacity::MentorCapacityRule;
pub use flight_plan::FlightPlanProjectionRule;
pub use funding::DonationTrendRule;
pub use growth::StudentGrowthRule;
pub use network::OrgNetworkHealthRule;
pub use programs::ProgramCompletionRule;
