mod give_time;
mod specific_time;

pub use give_time::GiveTime;
pub use specific_time::SpecificTime;
