//! # Catalog
//!
//! Winter activity records shared by the server and the operator tools.
//!
//! ## Seed
//!
//! Ten starter activities, loaded only into an empty store:
//! - Snow needed: Skiing, Snowboarding, Sledding, Snowshoeing, Snowman Building, Dog Sledding
//! - No snow: Ice Skating, Hot Chocolate Tour, Winter Hiking, Ice Fishing
//! - Free: Winter Hiking, Snowman Building
pub mod activities;

use activities::NewActivity;

const INITIAL_ACTIVITIES: [(&str, f64, bool); 10] = [
    ("Skiing", 75.0, true),
    ("Snowboarding", 80.0, true),
    ("Ice Skating", 15.0, false),
    ("Sledding", 20.0, true),
    ("Snowshoeing", 30.0, true),
    ("Hot Chocolate Tour", 25.0, false),
    ("Winter Hiking", 0.0, false),
    ("Snowman Building", 0.0, true),
    ("Ice Fishing", 40.0, false),
    ("Dog Sledding", 150.0, true),
];

pub fn initial_activities() -> Vec<NewActivity> {
    INITIAL_ACTIVITIES
        .iter()
        .map(|&(name, price, is_snow_needed)| NewActivity {
            name: name.to_string(),
            price,
            is_snow_needed,
        })
        .collect()
}
