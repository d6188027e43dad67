use chrono::NaiveDate;

/// Best-effort interpretation of a raw date token lifted from a receipt.
///
/// Accepts the two shapes the extractor emits:
/// - `YYYY-M-D` (any of `-`, `/`, `.` as separator)
/// - `D-D-Y` where the year has 2–4 digits
///
/// The second shape is read as US month/day first. When the first part cannot be a
/// month (> 12) it is read as day/month instead. Two-digit years map to 20xx.
pub fn interpret_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split(['-', '/', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };

    if a.len() == 4 {
        let y: i32 = a.parse().ok()?;
        let m: u32 = b.parse().ok()?;
        let d: u32 = c.parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    let p1: u32 = a.parse().ok()?;
    let p2: u32 = b.parse().ok()?;
    let year = expand_year(c.parse().ok()?);

    NaiveDate::from_ymd_opt(year, p1, p2).or_else(|| NaiveDate::from_ymd_opt(year, p2, p1))
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}
