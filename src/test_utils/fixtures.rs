//! Test fixtures and common test data.

/// Common test data constants.
pub mod constants {
    pub const TEST_USER: &str = "kunde@example.com";
    pub const TEST_PASSWORD: &str = "geheim";
    pub const TEST_CONTRACT: &str = "2000";
    pub const TEST_METER: &str = "AT0030000000000000000000000123456";
    pub const TEST_METER_UUID: &str = "3f1c2d4e-5a6b-4c7d-8e9f-0a1b2c3d4e5f";
    pub const TEST_PREFIX: &str = "tinetz";
}

/// Wraps data lines in the preamble and header the portal puts above them.
pub fn export_payload(lines: &[&str]) -> String {
    let mut payload = String::from(
        "Zählpunkt;AT0030000000000000000000000123456\n\
         Zeitraum;13.03.2024 - 15.03.2024\n\
         Einheit;kWh\n\
         \n\
         DATE_FROM;DATE_TO;VALUE\n",
    );
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }
    payload
}

/// Analysis-init response describing the selected meter.
pub fn analysis_response(meter_uuid: &str) -> String {
    format!(
        r#"{{"lastImport":"2024-03-15T06:00:00.000+0100","currentIndicator":{{"indicatorID":"{}","indicatorType":"METER","name":"Bezug"}},"installations":[]}}"#,
        meter_uuid
    )
}

/// Flux CSV answer listing the given times as already stored.
pub fn flux_times_csv(times: &[&str]) -> String {
    let mut csv = String::from(",result,table,_time\r\n");
    for time in times {
        csv.push_str(&format!(",_result,0,{}\r\n", time));
    }
    csv
}
