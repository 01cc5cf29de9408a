use jiff::Zoned;

const FORMAT: &str = "%d-%b-%Y %H:%M:%S %z";

/// Parses an IMAP `INTERNALDATE`, keeping the offset the server reported.
pub fn parse(value: &str) -> Result<Zoned, jiff::Error> {
    let value = value.trim();
    // day may be space padded or a single digit
    if value.find('-') == Some(1) {
        Zoned::strptime(FORMAT, format!("0{value}"))
    } else {
        Zoned::strptime(FORMAT, value)
    }
}

pub fn format(value: &Zoned) -> String {
    value.strftime(FORMAT).to_string()
}
