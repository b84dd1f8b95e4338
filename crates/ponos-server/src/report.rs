//! Schedule table shown at startup and on request.

use chrono::{DateTime, Local, TimeZone, Utc};
use ponos_jobs::ScheduleRow;
use std::fmt::Display;

const HEADERS: [&str; 5] = ["Name", "Last Execution", "Next Execution", "Schedule", "Executions"];

/// `%Z` prints `UTC` for [`Utc`]. chrono has no zone names for [`Local`] or
/// fixed offsets, so those print the offset instead, e.g. `+02:00`.
const TIME_FORMAT: &str = "%a %b, %-d %H:%M:%S %Z";

/// Formats a fire time in the given zone, `Never` when unset.
pub fn format_time_in<Tz>(time: Option<DateTime<Utc>>, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match time {
        Some(time) => time.with_timezone(zone).format(TIME_FORMAT).to_string(),
        None => "Never".to_string(),
    }
}

/// Renders the rows as a bordered text table, times in local time.
pub fn render_schedule(rows: &[ScheduleRow]) -> String {
    render_schedule_in(rows, &Local)
}

/// Like [`render_schedule`] with an explicit time zone.
pub fn render_schedule_in<Tz>(rows: &[ScheduleRow], zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.name.clone(),
                format_time_in(row.prev, zone),
                format_time_in(row.next, zone),
                row.period.clone(),
                row.executions.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = widths
        .iter()
        .fold(String::from("+"), |mut line, width| {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
            line
        });

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    push_line(&mut out, &HEADERS, &widths);
    out.push_str(&border);
    out.push('\n');
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out.push_str(&border);
    out.push('\n');
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        let cell = cell.as_ref();
        let pad = width - cell.chars().count();
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(pad + 1));
        out.push('|');
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn rows() -> Vec<ScheduleRow> {
        vec![
            ScheduleRow {
                name: "report".to_string(),
                period: "0 */5 * * * *".to_string(),
                prev: Some(Utc.with_ymd_and_hms(2023, 11, 14, 22, 10, 0).unwrap()),
                next: Some(Utc.with_ymd_and_hms(2023, 11, 14, 22, 15, 0).unwrap()),
                executions: 12,
            },
            ScheduleRow {
                name: "cleanup".to_string(),
                period: "@daily".to_string(),
                prev: None,
                next: Some(Utc.with_ymd_and_hms(2023, 11, 15, 0, 0, 0).unwrap()),
                executions: 0,
            },
        ]
    }

    #[test]
    fn test_format_time() {
        let at = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(format_time_in(Some(at), &Utc), "Tue Nov, 14 22:13:20 UTC");
        assert_eq!(format_time_in(None, &Utc), "Never");
    }

    #[test]
    fn test_format_time_with_offset_zone() {
        let at = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_time_in(Some(at), &zone), "Wed Nov, 15 00:13:20 +02:00");
    }

    #[test]
    fn test_table_layout() {
        let table = render_schedule_in(&rows(), &Utc);
        let lines: Vec<&str> = table.lines().collect();

        // border, header, border, two rows, border
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("Last Execution"));
        assert!(lines[3].starts_with("| report "));
        assert!(lines[3].contains("Tue Nov, 14 22:10:00 UTC"));
        assert!(lines[3].contains("| 12 "));
        assert!(lines[4].contains("Never"));
        assert!(lines[4].contains("@daily"));

        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
    }

    #[test]
    fn test_empty_schedule_renders_headers() {
        let table = render_schedule_in(&[], &Utc);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("Executions"));
    }
}
