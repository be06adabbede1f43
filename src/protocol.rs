use std::str::FromStr;

/// Number of values carried by every line the device sends.
pub const VALUES_PER_SAMPLE: usize = 3;

/// Sample is one line worth of readings, in the order the device sent them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample(pub [f64; VALUES_PER_SAMPLE]);

impl Sample {
    pub fn values(&self) -> &[f64; VALUES_PER_SAMPLE] {
        &self.0
    }

    /// Render the sample as written to the output file, e.g. "1.0, -2.5, 0.125".
    pub fn to_line(&self) -> String {
        let [v0, v1, v2] = self.0.map(format_value);
        format!("{v0}, {v1}, {v2}")
    }
}

/// Format a single value the way Python's str(float) does: shortest
/// round-trip digits, always a decimal point or exponent, exponents signed and
/// at least two digits wide ("1e+16", "1e-05"), lowercase "nan"/"inf".
/// Debug formatting already picks the same digits and the same switch-over to
/// scientific notation (below 1e-4 and from 1e16), so only the spelling of the
/// exponent and of NaN needs adjusting.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let formatted = format!("{value:?}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    match exponent.strip_prefix('-') {
        Some(digits) => format!("{mantissa}e-{digits:0>2}"),
        None => format!("{mantissa}e+{exponent:0>2}"),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unable to parse {received_message:?}: {reason}")]
pub struct ParseError {
    pub received_message: String,
    pub reason: String,
}

impl PartialEq for ParseError {
    fn eq(&self, other: &Self) -> bool {
        self.received_message == other.received_message
    }
}

impl Eq for ParseError {}

/// Decode a raw line as read from the port. Devices that are mid-boot or
/// running at the wrong baud rate happily send garbage, which we refuse
/// rather than lossily convert.
pub fn decode_line(raw: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(raw).map_err(|e| ParseError {
        received_message: String::from_utf8_lossy(raw).into_owned(),
        reason: format!("line is not valid UTF-8 ({e})"),
    })
}

/// Parse a single line of comma-separated values.
/// Blank lines (which many devices emit between bursts, or as the second half
/// of a CRLF when the reader splits on CR) are not an error, and yield None.
/// Every field must be numeric, but only the first three are kept.
pub fn parse_line(line: &str) -> Result<Option<Sample>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut values = [0.0; VALUES_PER_SAMPLE];
    let mut field_count = 0;
    for field in line.split(',') {
        let field = field.trim();
        let value = match f64::from_str(field) {
            Ok(v) => v,
            Err(_) => {
                return Err(ParseError {
                    received_message: line.to_string(),
                    reason: format!("unable to parse value {field:?}"),
                })
            }
        };
        if let Some(slot) = values.get_mut(field_count) {
            *slot = value;
        }
        field_count += 1;
    }

    if field_count < VALUES_PER_SAMPLE {
        return Err(ParseError {
            received_message: line.to_string(),
            reason: format!("expected {VALUES_PER_SAMPLE} values, got {field_count}"),
        });
    }
    if field_count > VALUES_PER_SAMPLE {
        log::debug!(
            "ignoring {} trailing value(s) in {line:?}",
            field_count - VALUES_PER_SAMPLE
        );
    }
    Ok(Some(Sample(values)))
}
