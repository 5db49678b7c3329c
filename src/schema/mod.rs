pub mod gender;
pub mod params;
pub mod race;
