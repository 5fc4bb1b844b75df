//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use savings_analyzer::data::parser::parse_reader;
use savings_analyzer::data::{Dataset, SystemSet};
use savings_analyzer::engine::PreparedDataset;
use savings_analyzer::synth::SyntheticSite;

/// Two systems over three circuits. System 1 installs on 2024-03-02,
/// System 2 on 2024-03-03.
pub const TWO_SYSTEM_CSV: &str = "\
TIME_STAMP,C_1,C_2,C_3,TEMP_OUT,TEMP_GATE,HUMID_OUT
03/01/2024 10:00:00,10,5,7,30.2,20.0,55
03/01/2024 10:30:00,10,5,7,30.4,20.1,55
03/02/2024 00:00:00,12,6,8,25.0,20.0,60
03/03/2024 10:00:00,8,4,7,30.1,20.0,58
03/04/2024 10:00:00,8,4,5,,20.0,57
03/04/2024 11:00:00,8,4,5,30.0,19.9,57
";

pub const TWO_SYSTEM_SIDECAR: &str = r#"{
    "System 1": ["C_1", "C_2"],
    "System 2": ["C_3"],
    "Installation Date System 1": "2024-03-02",
    "Installation Date System 2": "2024-03-03",
    "Project Name": "fixture"
}"#;

pub fn two_system_dataset() -> Dataset {
    parse_reader(TWO_SYSTEM_CSV.as_bytes()).expect("fixture table should parse")
}

pub fn two_system_systems() -> SystemSet {
    SystemSet::from_json_str(TWO_SYSTEM_SIDECAR).expect("fixture sidecar should decode")
}

pub fn two_system_prepared() -> PreparedDataset {
    PreparedDataset::new(two_system_dataset(), two_system_systems())
}

/// Four weeks of hourly data for two systems with 20% savings after
/// installation and no noise.
pub fn noiseless_site() -> SyntheticSite {
    SyntheticSite {
        noise_std: 0.0,
        ..SyntheticSite::default()
    }
}
