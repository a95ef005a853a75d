// 🇧🇷 Locale formatting - pt-BR strings handed to the export sink
// Currency uses "." for thousands and "," for decimals; dates are dd/mm/yyyy.

use chrono::NaiveDateTime;

pub const BR_DATE_FORMAT: &str = "%d/%m/%Y";

/// 1234.5 → "R$ 1.234,50"; negatives keep the sign after the symbol
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = group_thousands(cents / 100);
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("R$ {sign}{units},{:02}", cents % 100)
}

fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let group = n % 1000;
        n /= 1000;
        if n == 0 {
            groups.push(group.to_string());
            break;
        }
        groups.push(format!("{group:03}"));
    }
    groups.reverse();
    groups.join(".")
}

pub fn format_date_br(date: &NaiveDateTime) -> String {
    date.format(BR_DATE_FORMAT).to_string()
}

/// Empty string for a missing date
pub fn format_optional_date(date: Option<&NaiveDateTime>) -> String {
    date.map(format_date_br).unwrap_or_default()
}

/// Whole quantities print without decimals ("12"), fractional ones with a
/// decimal comma ("1,5")
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string().replace('.', ",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(5.5), "R$ 5,50");
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_brl(999.999), "R$ 1.000,00");
        assert_eq!(format_brl(-1234.56), "R$ -1.234,56");
        assert_eq!(format_brl(-0.001), "R$ 0,00");
    }

    #[test]
    fn test_format_date_br() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(format_date_br(&date), "05/03/2024");
        assert_eq!(format_optional_date(Some(&date)), "05/03/2024");
        assert_eq!(format_optional_date(None), "");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(12.0), "12");
        assert_eq!(format_quantity(1.5), "1,5");
        assert_eq!(format_quantity(0.0), "0");
    }
}
