mod reading;
mod tariff;
mod user;

pub use reading::{rolling_mean, NewReading, Reading, ReadingId, UserId};
pub use tariff::Tariff;
pub use user::{NewUser, User};
