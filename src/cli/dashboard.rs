use std::collections::BTreeSet;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};
use tracing::debug;

use crate::dataset::{self, Dataset, LoadMode, LoadSource};
use crate::error::Result;
use crate::filter::{CategoryFilter, Filter, ItemRange};
use crate::fmt::{format_bytes, money, money_whole, number};
use crate::models::Season;
use crate::reports::{self, Analysis};
use crate::settings::load_settings;
use crate::tui::{
    compact, run_screen, Screen, ScreenAction, BAR_STYLE, FOOTER_STYLE, HEADER_STYLE,
    SELECTED_STYLE, SERIES_COLORS, TITLE_STYLE,
};

const SIDEBAR_WIDTH: u16 = 30;
const EMPTY: &str = "No transactions match the current filters.";

// ---------------------------------------------------------------------------
// Sidebar controls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Category,
    Season(usize),
    MinItems,
    MaxItems,
}

/// Sidebar filter state. Starts with every option selected, which matches
/// the unfiltered dataset.
#[derive(Debug, Clone)]
struct Controls {
    categories: Vec<String>,
    /// 0 is "All", `i + 1` is `categories[i]`.
    category: usize,
    seasons: Vec<(String, bool)>,
    bounds: Option<(u32, u32)>,
    lower: u32,
    upper: u32,
    focus: usize,
}

impl Controls {
    fn new(dataset: &Dataset) -> Self {
        let opts = dataset.filter_options();
        let (lower, upper) = opts.item_bounds.unwrap_or((0, 0));
        Self {
            categories: opts.categories,
            category: 0,
            seasons: opts.seasons.into_iter().map(|s| (s, true)).collect(),
            bounds: opts.item_bounds,
            lower,
            upper,
            focus: 0,
        }
    }

    fn controls(&self) -> Vec<Control> {
        let mut out = vec![Control::Category];
        out.extend((0..self.seasons.len()).map(Control::Season));
        out.push(Control::MinItems);
        out.push(Control::MaxItems);
        out
    }

    fn focused(&self) -> Control {
        self.controls()[self.focus]
    }

    fn category_label(&self) -> &str {
        match self.category {
            0 => "All",
            i => &self.categories[i - 1],
        }
    }

    fn reset(&mut self) {
        let focus = self.focus;
        self.category = 0;
        for (_, on) in &mut self.seasons {
            *on = true;
        }
        if let Some((lo, hi)) = self.bounds {
            self.lower = lo;
            self.upper = hi;
        }
        self.focus = focus;
    }

    /// Move the selected value of the focused control. `forward` is Right/Space.
    fn adjust(&mut self, forward: bool) {
        let options = self.categories.len() + 1;
        match self.focused() {
            Control::Category => {
                self.category = if forward {
                    (self.category + 1) % options
                } else {
                    (self.category + options - 1) % options
                };
            }
            Control::Season(i) => self.seasons[i].1 = !self.seasons[i].1,
            Control::MinItems => {
                if let Some((lo, _)) = self.bounds {
                    self.lower = if forward {
                        (self.lower + 1).min(self.upper)
                    } else {
                        self.lower.saturating_sub(1).max(lo)
                    };
                }
            }
            Control::MaxItems => {
                if let Some((_, hi)) = self.bounds {
                    self.upper = if forward {
                        (self.upper + 1).min(hi)
                    } else {
                        self.upper.saturating_sub(1).max(self.lower)
                    };
                }
            }
        }
    }

    /// Returns true when the filter changed.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let count = self.controls().len();
        match code {
            KeyCode::Up | KeyCode::BackTab => {
                self.focus = (self.focus + count - 1) % count;
                false
            }
            KeyCode::Down | KeyCode::Tab => {
                self.focus = (self.focus + 1) % count;
                false
            }
            KeyCode::Left => {
                self.adjust(false);
                true
            }
            KeyCode::Right | KeyCode::Char(' ') | KeyCode::Enter => {
                self.adjust(true);
                true
            }
            KeyCode::Char('r') => {
                self.reset();
                true
            }
            _ => false,
        }
    }

    fn to_filter(&self) -> Filter {
        let category = match self.category {
            0 => CategoryFilter::All,
            i => CategoryFilter::Exact(self.categories[i - 1].clone()),
        };
        let seasons: BTreeSet<String> = self
            .seasons
            .iter()
            .filter(|(_, on)| *on)
            .map(|(s, _)| s.clone())
            .collect();
        Filter {
            category,
            seasons: Some(seasons),
            items: self.bounds.map(|_| ItemRange::new(self.lower, self.upper)),
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let style_for = |c: Control| {
            if self.focused() == c {
                SELECTED_STYLE
            } else {
                Style::default()
            }
        };
        let bound = |v: u32| match self.bounds {
            Some(_) => v.to_string(),
            None => "-".to_string(),
        };

        let mut lines = vec![
            Line::from(Span::styled(" Customer category", TITLE_STYLE)),
            Line::from(Span::styled(
                format!(" < {} >", self.category_label()),
                style_for(Control::Category),
            )),
            Line::from(""),
            Line::from(Span::styled(" Seasons", TITLE_STYLE)),
        ];
        for (i, (name, on)) in self.seasons.iter().enumerate() {
            let mark = if *on { "x" } else { " " };
            lines.push(Line::from(Span::styled(
                format!(" [{mark}] {name}"),
                style_for(Control::Season(i)),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Items per basket", TITLE_STYLE)));
        lines.push(Line::from(Span::styled(
            format!(" Min  < {} >", bound(self.lower)),
            style_for(Control::MinItems),
        )));
        lines.push(Line::from(Span::styled(
            format!(" Max  < {} >", bound(self.upper)),
            style_for(Control::MaxItems),
        )));
        lines
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

struct Dashboard {
    dataset: Dataset,
    source: String,
    top_n: usize,
    controls: Controls,
    analysis: Analysis,
}

impl Dashboard {
    fn new(dataset: Dataset, source: String, top_n: usize) -> Self {
        let controls = Controls::new(&dataset);
        let analysis = reports::analyze(&dataset, &controls.to_filter(), top_n);
        Self {
            dataset,
            source,
            top_n,
            controls,
            analysis,
        }
    }

    fn refresh(&mut self) {
        let filter = self.controls.to_filter();
        debug!(filter = %filter.describe(), "dashboard filter changed");
        self.analysis = reports::analyze(&self.dataset, &filter, self.top_n);
    }

    fn draw_stats(&self, frame: &mut Frame, area: Rect) {
        let [left, right] = Layout::horizontal([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .areas(area);

        let s = &self.analysis.summary;
        let stats = vec![
            Line::from(format!(" Transactions   {}", number(s.transactions as u64))),
            Line::from(format!(" Total items    {}", number(s.total_items))),
            Line::from(format!(
                " Avg items      {}",
                s.average_items
                    .map(|a| format!("{a:.2}"))
                    .unwrap_or_else(|| "-".into())
            )),
            Line::from(format!(" Total cost     {}", money(s.total_cost))),
        ];
        frame.render_widget(Paragraph::new(stats), left);

        let h = &self.analysis.highlights;
        let dash = || "-".to_string();
        let highlights = vec![
            Line::from(format!(
                " Most sold      {}",
                h.most_sold.as_ref().map(|p| p.product.clone()).unwrap_or_else(dash)
            )),
            Line::from(format!(
                " Busiest size   {}",
                h.busiest_bucket.as_ref().map(|b| b.label()).unwrap_or_else(dash)
            )),
            Line::from(format!(
                " Cheapest year  {}",
                h.cheapest_year
                    .as_ref()
                    .map(|y| format!("{} ({})", y.year, money_whole(y.total_cost)))
                    .unwrap_or_else(dash)
            )),
            Line::from(format!(
                " Peak season    {}",
                h.peak
                    .as_ref()
                    .map(|p| format!("{} {} ({})", p.season, p.year, money_whole(p.total_cost)))
                    .unwrap_or_else(dash)
            )),
        ];
        frame.render_widget(Paragraph::new(highlights), right);
    }

    fn draw_top(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!("Top {} Most Sold Products", self.top_n))
            .title_style(TITLE_STYLE)
            .borders(Borders::NONE);
        let top = &self.analysis.top_products;
        if top.is_empty() {
            frame.render_widget(Paragraph::new(EMPTY).style(FOOTER_STYLE).block(block), area);
            return;
        }
        let bars: Vec<Bar> = top
            .iter()
            .map(|p| {
                Bar::default()
                    .value(p.total_items)
                    .label(Line::from(p.product.as_str()))
                    .text_value(number(p.total_items))
                    .style(BAR_STYLE)
            })
            .collect();
        let chart = BarChart::default()
            .block(block)
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    fn draw_histogram(&self, frame: &mut Frame, area: Rect) {
        let hist = &self.analysis.histogram;
        let title = match hist.mean {
            Some(mean) => format!("Total Items Sold by Basket Size (mean {mean:.1})"),
            None => "Total Items Sold by Basket Size".to_string(),
        };
        let block = Block::default()
            .title(title)
            .title_style(TITLE_STYLE)
            .borders(Borders::NONE);
        if hist.buckets.is_empty() {
            frame.render_widget(Paragraph::new(EMPTY).style(FOOTER_STYLE).block(block), area);
            return;
        }
        let bars: Vec<Bar> = hist
            .buckets
            .iter()
            .map(|b| {
                Bar::default()
                    .value(b.total_items)
                    .label(Line::from(format!("{}-{}", b.lower, b.upper - 1)))
                    .text_value(compact(b.total_items))
                    .style(BAR_STYLE)
            })
            .collect();
        let chart = BarChart::default()
            .block(block)
            .bar_width(5)
            .bar_gap(1)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    fn draw_seasonal(&self, frame: &mut Frame, area: Rect) {
        let rollup = &self.analysis.seasonal;
        let years = rollup.years();

        let mut title = vec![Span::styled("Total Sales Cost by Season and Year  ", TITLE_STYLE)];
        for (i, year) in years.iter().enumerate() {
            title.push(Span::styled(
                format!("■ {year}  "),
                Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]),
            ));
        }
        let block = Block::default().title(Line::from(title)).borders(Borders::NONE);
        if rollup.is_empty() {
            frame.render_widget(Paragraph::new(EMPTY).style(FOOTER_STYLE).block(block), area);
            return;
        }

        let groups: Vec<BarGroup> = Season::ALL
            .iter()
            .map(|&season| {
                let bars: Vec<Bar> = years
                    .iter()
                    .enumerate()
                    .map(|(i, &year)| {
                        let cost = rollup.get(season, year).unwrap_or(0).max(0) as u64;
                        Bar::default()
                            .value(cost)
                            .text_value(compact(cost))
                            .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                    })
                    .collect();
                BarGroup::default()
                    .label(Line::from(season.name()))
                    .bars(&bars)
            })
            .collect();

        let mut chart = BarChart::default()
            .block(block)
            .bar_width(5)
            .bar_gap(0)
            .group_gap(3);
        for group in groups {
            chart = chart.data(group);
        }
        frame.render_widget(chart, area);
    }
}

impl Screen for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, sep1, body_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" Market basket analysis  ({})", self.source))
                .style(HEADER_STYLE),
            header_area,
        );
        frame.render_widget(
            Paragraph::new("━".repeat(area.width as usize)).style(border_style),
            sep1,
        );

        let [sidebar_area, main_area] = Layout::horizontal([
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .areas(body_area);

        frame.render_widget(
            Paragraph::new(self.controls.lines()).block(
                Block::default()
                    .borders(Borders::RIGHT)
                    .border_style(border_style),
            ),
            sidebar_area,
        );

        let [stats_area, sep2, charts_top, charts_bottom] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Percentage(50),
            Constraint::Fill(1),
        ])
        .areas(main_area);

        self.draw_stats(frame, stats_area);
        frame.render_widget(
            Paragraph::new("━".repeat(main_area.width as usize)).style(border_style),
            sep2,
        );

        let [top_area, hist_area] = Layout::horizontal([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .areas(charts_top);
        self.draw_top(frame, top_area);
        self.draw_histogram(frame, hist_area);
        self.draw_seasonal(frame, charts_bottom);

        frame.render_widget(
            Paragraph::new(" Up/Down/Tab=move  Left/Right/Space=change  r=reset  q=quit")
                .style(FOOTER_STYLE),
            hints_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ScreenAction {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            return ScreenAction::Close;
        }
        if self.controls.handle_key(code) {
            self.refresh();
        }
        ScreenAction::Continue
    }
}

fn describe_source(source: &LoadSource) -> String {
    match source {
        LoadSource::Local(path) => path.display().to_string(),
        LoadSource::Cache { path, freshness } => {
            format!("{}, {}", path.display(), freshness.label())
        }
        LoadSource::Download(manifest) => {
            format!("downloaded {}", format_bytes(manifest.bytes))
        }
    }
}

pub fn run(mode: LoadMode) -> Result<()> {
    // Load failures abort before the terminal is taken over.
    let settings = load_settings();
    let loaded = dataset::load(&settings, mode)?;
    let source = describe_source(&loaded.source);

    let mut dashboard = Dashboard::new(loaded.dataset, source, settings.top_n);
    run_screen(&mut dashboard)
}
