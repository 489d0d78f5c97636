use crate::map::PopupOptions;
use crate::types::{Workout, WorkoutId, WorkoutKind};
use chrono::{Datelike, TimeZone, Timelike};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One icon/value/unit row of a list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

/// A workout as it appears in the list under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub id: WorkoutId,
    pub kind: WorkoutKind,
    pub title: String,
    pub rows: Vec<DetailRow>,
}

struct KindSpec {
    icon: &'static str,
    derived_unit: &'static str,
    secondary_icon: &'static str,
    secondary_unit: &'static str,
}

const fn spec(kind: WorkoutKind) -> KindSpec {
    match kind {
        WorkoutKind::Running => KindSpec {
            icon: "🏃",
            derived_unit: "min/km",
            secondary_icon: "🦶",
            secondary_unit: "spm",
        },
        WorkoutKind::Cycling => KindSpec {
            icon: "🚴",
            derived_unit: "km/h",
            secondary_icon: "⛰",
            secondary_unit: "m",
        },
    }
}

/// "Mar 15" in the given time zone.
pub fn month_day<Tz: TimeZone>(w: &Workout, tz: &Tz) -> String {
    let local = w.created_at().with_timezone(tz);
    format!("{} {}", MONTHS[local.month0() as usize], local.day())
}

/// "07:05", 24-hour clock.
pub fn clock_time<Tz: TimeZone>(w: &Workout, tz: &Tz) -> String {
    let local = w.created_at().with_timezone(tz);
    format!("{:02}:{:02}", local.hour(), local.minute())
}

pub fn title<Tz: TimeZone>(w: &Workout, tz: &Tz) -> String {
    format!("{} on {}", w.kind().label(), month_day(w, tz))
}

pub fn render_entry<Tz: TimeZone>(w: &Workout, tz: &Tz) -> RenderedEntry {
    let s = spec(w.kind());
    let rows = vec![
        DetailRow {
            icon: s.icon,
            value: w.distance_km().to_string(),
            unit: "km",
        },
        DetailRow {
            icon: "⏱",
            value: w.duration_min().to_string(),
            unit: "min",
        },
        DetailRow {
            icon: "⚡️",
            value: format!("{:.1}", w.derived_metric()),
            unit: s.derived_unit,
        },
        DetailRow {
            icon: s.secondary_icon,
            value: w.secondary_metric().to_string(),
            unit: s.secondary_unit,
        },
    ];

    RenderedEntry {
        id: w.id().clone(),
        kind: w.kind(),
        title: title(w, tz),
        rows,
    }
}

pub fn popup_content<Tz: TimeZone>(w: &Workout, tz: &Tz) -> String {
    format!("{} {}", spec(w.kind()).icon, title(w, tz))
}

pub fn popup_options(kind: WorkoutKind) -> PopupOptions {
    PopupOptions {
        class_name: format!("{kind}-popup"),
        ..PopupOptions::default()
    }
}

impl RenderedEntry {
    /// The `<li>` fragment inserted after the form element.
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<li class=\"workout workout--{}\" data-id=\"{}\">\n  <h2 class=\"workout__title\">{}</h2>\n",
            self.kind,
            escape(self.id.as_str()),
            escape(&self.title)
        );
        for row in &self.rows {
            html.push_str(&format!(
                "  <div class=\"workout__details\">\n    <span class=\"workout__icon\">{}</span>\n    <span class=\"workout__value\">{}</span>\n    <span class=\"workout__unit\">{}</span>\n  </div>\n",
                row.icon,
                escape(&row.value),
                row.unit
            ));
        }
        html.push_str("</li>\n");
        html
    }

    /// Single-line form for the terminal list.
    pub fn to_line(&self) -> String {
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|r| format!("{} {} {}", r.icon, r.value, r.unit))
            .collect();
        format!("{}  {}", self.title, rows.join("  "))
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coords, Cycling, Running, WorkoutBase};
    use chrono::Utc;

    fn base(distance_km: f64, duration_min: f64) -> WorkoutBase {
        WorkoutBase {
            id: WorkoutId::from("1710504000000"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 7, 5, 0).unwrap(),
            coords: Coords::new(51.5, -0.12),
            distance_km,
            duration_min,
            clicks: 0,
        }
    }

    #[test]
    fn running_entry() {
        let w = Workout::Running(Running::new(base(5.0, 30.0), 150.0));
        let e = render_entry(&w, &Utc);
        assert_eq!(e.title, "Running on Mar 15");
        let cells: Vec<(&str, &str)> = e.rows.iter().map(|r| (r.value.as_str(), r.unit)).collect();
        assert_eq!(
            cells,
            vec![("5", "km"), ("30", "min"), ("6.0", "min/km"), ("150", "spm")]
        );
        assert_eq!(e.rows[0].icon, "🏃");
    }

    #[test]
    fn cycling_entry() {
        let w = Workout::Cycling(Cycling::new(base(20.0, 60.0), 100.0));
        let e = render_entry(&w, &Utc);
        assert_eq!(e.title, "Cycling on Mar 15");
        assert_eq!(e.rows[2].value, "20.0");
        assert_eq!(e.rows[2].unit, "km/h");
        assert_eq!(e.rows[3].value, "100");
        assert_eq!(e.rows[3].unit, "m");
    }

    #[test]
    fn popup_is_keyed_by_kind() {
        let w = Workout::Cycling(Cycling::new(base(20.0, 60.0), 100.0));
        assert_eq!(popup_content(&w, &Utc), "🚴 Cycling on Mar 15");
        let opts = popup_options(WorkoutKind::Cycling);
        assert_eq!(opts.class_name, "cycling-popup");
        assert_eq!(opts.max_width, 250);
        assert_eq!(opts.min_width, 100);
        assert!(!opts.auto_close);
        assert!(!opts.close_on_click);
    }

    #[test]
    fn html_carries_id_and_kind() {
        let w = Workout::Running(Running::new(base(5.0, 30.0), 150.0));
        let html = render_entry(&w, &Utc).to_html();
        assert!(html.starts_with("<li class=\"workout workout--running\" data-id=\"1710504000000\">"));
        assert!(html.contains("<span class=\"workout__unit\">min/km</span>"));
        assert_eq!(html.matches("workout__details").count(), 4);
    }

    #[test]
    fn clock_time_is_zero_padded() {
        let w = Workout::Running(Running::new(base(5.0, 30.0), 150.0));
        assert_eq!(clock_time(&w, &Utc), "07:05");
    }
}
