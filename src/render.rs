use crate::activity::{self, coord, ActivitySeries, GRID_COUNT, LABEL_Y, MONTH_LABELS, SLOTS_PER_MONTH, X_END, X_START};
use crate::error::{Result, StatsError};
use crate::models::{LanguageStat, RecentCommit};
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

/// Delay between the entrance animations of consecutive list items
const DELAY_BETWEEN_MS: usize = 150;
const DEFAULT_LANGUAGE_COLOR: &str = "#000000";

const OVERVIEW_PLACEHOLDERS: &[&str] = &[
    "{{ name }}",
    "{{ stars }}",
    "{{ forks }}",
    "{{ contributions }}",
    "{{ lines_changed }}",
    "{{ views }}",
    "{{ repos }}",
];
const LANGUAGES_PLACEHOLDERS: &[&str] = &["{{ progress }}", "{{ lang_list }}"];
const RECENT_COMMITS_PLACEHOLDERS: &[&str] = &["{{ commits }}"];
const ACTIVITY_PLACEHOLDERS: &[&str] = &[
    "{{ TITLE }}",
    "{{ GRID_H }}",
    "{{ GRID_V }}",
    "{{ PATH }}",
    "{{ WEEK_DOTS }}",
    "{{ MAIN_DOTS }}",
    "{{ MONTH_LABELS }}",
    "{{ Y_LABELS }}",
];

/// The four SVG templates the badges are rendered from
#[derive(Debug, Clone)]
pub struct Templates {
    pub overview: String,
    pub languages: String,
    pub activity_graph: String,
    pub recent_commits: String,
}

impl Templates {
    /// Templates compiled into the binary
    pub fn embedded() -> Self {
        Self {
            overview: include_str!("../templates/overview.svg").to_string(),
            languages: include_str!("../templates/languages.svg").to_string(),
            activity_graph: include_str!("../templates/activity_graph.svg").to_string(),
            recent_commits: include_str!("../templates/recent_commits.svg").to_string(),
        }
    }

    /// Reads `overview.svg`, `languages.svg`, `activity_graph.svg` and
    /// `recent_commits.svg` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str, placeholders: &[&str]| -> Result<String> {
            let path = dir.join(name);
            let template = std::fs::read_to_string(&path).map_err(|e| {
                StatsError::TemplateError(format!("Cannot read {}: {}", path.display(), e))
            })?;
            for placeholder in placeholders.iter().filter(|p| !template.contains(**p)) {
                warn!(template = name, placeholder, "Template is missing a placeholder");
            }
            Ok(template)
        };

        Ok(Self {
            overview: read("overview.svg", OVERVIEW_PLACEHOLDERS)?,
            languages: read("languages.svg", LANGUAGES_PLACEHOLDERS)?,
            activity_graph: read("activity_graph.svg", ACTIVITY_PLACEHOLDERS)?,
            recent_commits: read("recent_commits.svg", RECENT_COMMITS_PLACEHOLDERS)?,
        })
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Values shown on the overview card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverviewData {
    pub name: String,
    pub stars: u64,
    pub forks: u64,
    pub contributions: u64,
    pub lines_changed: u64,
    pub views: u64,
    pub repos: u64,
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Escapes text for use in XML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if c.is_control() && !matches!(c, '\n' | '\t' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

pub fn render_overview(template: &str, data: &OverviewData) -> String {
    template
        .replace("{{ name }}", &escape_xml(&data.name))
        .replace("{{ stars }}", &format_thousands(data.stars))
        .replace("{{ forks }}", &format_thousands(data.forks))
        .replace("{{ contributions }}", &format_thousands(data.contributions))
        .replace("{{ lines_changed }}", &format_thousands(data.lines_changed))
        .replace("{{ views }}", &format_thousands(data.views))
        .replace("{{ repos }}", &format_thousands(data.repos))
}

/// `languages` are expected largest first.
pub fn render_languages(template: &str, languages: &[(String, LanguageStat)]) -> String {
    let mut progress = String::new();
    let mut lang_list = String::new();

    for (i, (lang, stat)) in languages.iter().enumerate() {
        let color = escape_xml(stat.color.as_deref().unwrap_or(DEFAULT_LANGUAGE_COLOR));
        let _ = write!(
            progress,
            r#"<span style="background-color: {};width: {:0.3}%;" class="progress-item"></span>"#,
            color, stat.prop
        );
        let _ = write!(
            lang_list,
            r#"
<li style="animation-delay: {delay}ms;">
<svg xmlns="http://www.w3.org/2000/svg" class="octicon" style="fill:{color};"
viewBox="0 0 16 16" version="1.1" width="16" height="16"><path
fill-rule="evenodd" d="M8 4a4 4 0 100 8 4 4 0 000-8z"></path></svg>
<span class="lang">{lang}</span>
<span class="percent">{prop:0.2}%</span>
</li>
"#,
            delay = i * DELAY_BETWEEN_MS,
            color = color,
            lang = escape_xml(lang),
            prop = stat.prop,
        );
    }

    template
        .replace("{{ progress }}", &progress)
        .replace("{{ lang_list }}", &lang_list)
}

pub fn render_recent_commits(template: &str, commits: &[RecentCommit]) -> String {
    let mut items = String::new();

    for (i, commit) in commits.iter().enumerate() {
        let badge = if i == 0 {
            r#"<span class="badge">latest</span>"#
        } else {
            ""
        };
        let _ = write!(
            items,
            r#"
<li style="animation-delay:{delay}ms">
<div class="repo">
<span class="dot"></span>
<span class="text">{repo}</span>
{badge}
</div>
<div class="commit">
<span class="child-line"></span>
<div>
<span class="commit-msg">{message}</span>
<span class="meta">by {author} &#8226; {date}</span>
</div>
</div>
</li>
"#,
            delay = i * DELAY_BETWEEN_MS,
            repo = escape_xml(&commit.repo),
            badge = badge,
            message = escape_xml(&commit.message),
            author = escape_xml(&commit.author),
            date = escape_xml(&commit.date),
        );
    }

    template.replace("{{ commits }}", &items)
}

pub fn render_activity_graph(template: &str, series: &ActivitySeries) -> String {
    let max = series.max_value();

    let mut grid_h = String::new();
    for i in 0..=GRID_COUNT {
        let y = coord(activity::grid_y(i));
        let _ = writeln!(
            grid_h,
            r#"<line x1="{}" x2="{}" y1="{y}" y2="{y}" class="grid-h"/>"#,
            coord(X_START),
            coord(X_END),
        );
    }

    let mut grid_v = String::new();
    for i in 0..series.values.len() {
        let x = coord(activity::slot_x(i));
        let class = if i % SLOTS_PER_MONTH == 0 { "grid-month" } else { "grid-week" };
        let _ = writeln!(
            grid_v,
            r#"<line x1="{x}" y1="{}" x2="{x}" y2="{}" class="{class}"/>"#,
            coord(activity::TOP),
            coord(activity::BOTTOM),
        );
    }

    let path = activity::bezier_path(&activity::points(series));

    let mut week_dots = String::new();
    let mut main_dots = String::new();
    for (i, value) in series.values.iter().enumerate() {
        let Some(value) = *value else {
            continue;
        };
        let x = activity::slot_x(i);
        let y = coord(activity::map_y(value, max));
        let dot = |class: &str| {
            format!(
                "<line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" class=\"{class}\"/>\n",
                coord(x),
                coord(x + 0.01),
            )
        };
        week_dots.push_str(&dot("ct-point-week"));
        if value > 0 {
            main_dots.push_str(&dot("ct-point-main"));
        }
    }

    let mut month_labels = String::new();
    for (i, month) in MONTH_LABELS.iter().enumerate() {
        let x = activity::slot_x(i * SLOTS_PER_MONTH + 2);
        let _ = writeln!(
            month_labels,
            r#"<text x="{}" y="{}" text-anchor="middle" class="ct-label">{month}</text>"#,
            coord(x),
            coord(LABEL_Y),
        );
    }

    let mut y_labels = String::new();
    for i in 0..=GRID_COUNT {
        let _ = writeln!(
            y_labels,
            r#"<text x="{}" y="{}" text-anchor="end" class="ct-label">{}</text>"#,
            coord(X_START - 10.0),
            coord(activity::grid_y(i) + 4.0),
            activity::y_label(max, i),
        );
    }

    template
        .replace("{{ TITLE }}", &format!("Contribution Activity ({})", series.year))
        .replace("{{ GRID_H }}", &grid_h)
        .replace("{{ GRID_V }}", &grid_v)
        .replace("{{ PATH }}", &path)
        .replace("{{ WEEK_DOTS }}", &week_dots)
        .replace("{{ MAIN_DOTS }}", &main_dots)
        .replace("{{ MONTH_LABELS }}", &month_labels)
        .replace("{{ Y_LABELS }}", &y_labels)
}
