//! Positional view over one comma-delimited sensor record.

pub const DELIMITER: char = ',';

/// Column layout of the on-board sensor CSV. Only a handful are consumed.
pub const COLUMNS: [&str; 41] = [
    "IDENTIFIER",
    "DATE",
    "TIME",
    "LATITUDE",
    "LONGITUDE",
    "ALTITUDE",
    "SPEED",
    "COURSE",
    "NO2",
    "NO2_LIFE",
    "PM1",
    "PM25",
    "PM4",
    "PM10",
    "PM05#",
    "PM1#",
    "PM25#",
    "PM4#",
    "PM10#",
    "PM_SIZE",
    "S_CO2",
    "S_VOC",
    "S_H2,S_ETHANOL",
    "S_HUMIDITY",
    "S_TEMPERATURE",
    "S_ABS_HUMIDITY",
    "S_HEAT_INDEX",
    "S_DEW_POINT,PRESSURE",
    "TEMPERATURE",
    "HUMIDITY",
    "O_TEMPERATURE",
    "O_HUMIDITY",
    "O_ILLUMINANCE",
    "O_UV",
    "O_PRESSURE",
    "O_NOISE",
    "O_FUKAI",
    "O_WBGT",
    "O_BATT",
    "RSSI",
    "SENSOR_STATUS",
];

pub const IDENTIFIER: usize = 0;
pub const DATE: usize = 1;
pub const TIME: usize = 2;
pub const LATITUDE: usize = 3;
pub const LONGITUDE: usize = 4;
pub const ALTITUDE: usize = 5;
pub const SPEED: usize = 6;
pub const RSSI: usize = 39;

/// Column name for diagnostics, or "?" past the known layout.
pub fn column_name(index: usize) -> &'static str {
    COLUMNS.get(index).copied().unwrap_or("?")
}

/// Tokens of one raw record, borrowed from the input and left unaltered.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> RawRecord<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self { tokens: raw.split(DELIMITER).collect() }
    }

    /// Token at `index`, `None` when the record is too short.
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).copied()
    }

    pub fn identifier(&self) -> &'a str {
        self.field(IDENTIFIER).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_tokens_verbatim() {
        let r = RawRecord::parse(" 600002 ,2023-01-01,,x");
        assert_eq!(r.len(), 4);
        assert_eq!(r.field(0), Some(" 600002 "));
        assert_eq!(r.field(2), Some(""));
        assert_eq!(r.field(3), Some("x"));
    }

    #[test]
    fn test_out_of_range_is_none() {
        let r = RawRecord::parse("a,b");
        assert_eq!(r.field(RSSI), None);
        assert_eq!(r.field(2), None);
    }

    #[test]
    fn test_empty_input_has_one_empty_token() {
        let r = RawRecord::parse("");
        assert_eq!(r.len(), 1);
        assert_eq!(r.identifier(), "");
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(LATITUDE), "LATITUDE");
        assert_eq!(column_name(RSSI), "RSSI");
        assert_eq!(column_name(99), "?");
    }
}
