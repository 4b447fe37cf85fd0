use crate::app::{App, InlineInput, InputTarget, Mode, SETTINGS_ITEMS};
use crate::dates;
use crate::focus::NavItem;
use crate::model::{Goal, Subtask};
use crate::projector::{
    DayColumn, MonthGrid, Overview, OverviewItem, Projection, QuarterSummary, View, YearGrid,
};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const WEEKDAY_HEADINGS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

#[derive(Default)]
pub struct Viewport {
    offsets: Vec<usize>,
}

pub fn run(mut app: App) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut app, &mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

fn event_loop(app: &mut App, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut viewport = Viewport::default();
    loop {
        app.set_today(dates::today());
        terminal.draw(|f| draw(f, app, &mut viewport))?;
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key) {
                    break;
                }
            }
        }
    }
    Ok(())
}

pub fn draw(f: &mut Frame<'_>, app: &App, viewport: &mut Viewport) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(f.size());

    draw_header(f, app, layout[0]);
    match app.projection() {
        Projection::Columns(columns) => draw_columns(f, app, viewport, &columns, layout[1]),
        Projection::Month(grid) => draw_month(f, app, &grid, layout[1]),
        Projection::Quarter(summary) => draw_quarter(f, app, &summary, layout[1]),
        Projection::Year(grid) => draw_year(f, app, &grid, layout[1]),
        Projection::Overview(overview) => draw_overview(f, app, &overview, layout[1]),
    }
    draw_footer(f, app, layout[2]);

    match &app.mode {
        Mode::Settings { selected } => draw_settings(f, app, *selected),
        Mode::Notice(message) => draw_notice(f, message),
        Mode::Input(input) if is_path_input(&input.target) => draw_path_input(f, input),
        Mode::Input(_) | Mode::Normal => {}
    }
}

fn draw_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        "epoch ",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    for view in View::ALL {
        let style = if view == app.view {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", view.label()), style));
    }
    spans.extend([
        Span::raw("  •  "),
        Span::styled(
            period_label(app.view, app.anchor, app.today),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  •  "),
        Span::styled(app.storage.scope.label(), Style::default().fg(Color::Green)),
        Span::raw("  •  "),
        Span::styled(
            match app.last_save {
                Some(last) => format!("saved {}", format_elapsed(last)),
                None => "no changes yet".to_string(),
            },
            Style::default().fg(Color::Gray),
        ),
    ]);
    if app.has_background {
        spans.extend([
            Span::raw("  •  "),
            Span::styled("custom background", Style::default().fg(Color::LightYellow)),
        ]);
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let paragraph = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn period_label(view: View, anchor: NaiveDate, today: NaiveDate) -> String {
    match view {
        View::Today => dates::format_day(today),
        View::Overview => "all goals".to_string(),
        View::Day => format!(
            "{} - {}",
            dates::format_day(dates::add_days(anchor, -1)),
            dates::format_day(dates::add_days(anchor, 2))
        ),
        View::Week => {
            let start = dates::week_start(anchor);
            format!(
                "{} - {}",
                dates::format_day(start),
                dates::format_day(dates::add_days(start, 6))
            )
        }
        View::Month => dates::format_month_year(anchor),
        View::Quarter => format!("Q{} {}", dates::quarter_index(anchor) + 1, anchor.year()),
        View::Year => anchor.year().to_string(),
    }
}

fn draw_columns(
    f: &mut Frame<'_>,
    app: &App,
    viewport: &mut Viewport,
    columns: &[DayColumn<'_>],
    area: Rect,
) {
    let constraints = columns
        .iter()
        .map(|_| Constraint::Ratio(1, columns.len().max(1) as u32))
        .collect::<Vec<_>>();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    viewport.offsets.resize(columns.len(), 0);

    let rows = app.focus.columns();
    for (idx, column) in columns.iter().enumerate() {
        let width = chunks[idx].width.saturating_sub(2) as usize;
        let items = rows
            .get(idx)
            .map(|items| items.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|item| nav_item_row(app, column, item, width))
            .collect::<Vec<_>>();

        let mut state = ListState::default();
        let viewport_rows = chunks[idx].height.saturating_sub(2) as usize;
        let focused_column = app.focus.current_column() == Some(idx);
        let selected = match app.focus.focus() {
            crate::focus::Focus::Focused { column, item } if column == idx => Some(item),
            _ => None,
        };
        let mut offset = viewport.offsets[idx];
        if let Some(sel) = selected {
            offset = adjust_offset(sel, offset, viewport_rows, 1, items.len());
            state.select(Some(sel));
        }
        viewport.offsets[idx] = offset;
        *state.offset_mut() = offset;

        let (total, completed) = crate::projector::day_counts(column.goals);
        let mut title = dates::format_day(column.date);
        if column.is_today {
            title.push_str(" • today");
        }
        if total > 0 {
            title.push_str(&format!(" ({}/{})", completed, total));
        }
        let accent = if column.is_today {
            Color::Cyan
        } else {
            color_for_index(column.date.weekday().num_days_from_monday() as usize)
        };
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default()
                    .fg(accent)
                    .add_modifier(if focused_column {
                        Modifier::BOLD | Modifier::UNDERLINED
                    } else {
                        Modifier::BOLD
                    }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if column.is_today {
                Color::Cyan
            } else {
                Color::DarkGray
            }))
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));

        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, chunks[idx], &mut state);
    }
}

fn input_on<'a>(app: &'a App, item: &NavItem) -> Option<&'a InlineInput> {
    let input = match &app.mode {
        Mode::Input(input) => input,
        _ => return None,
    };
    let hit = match (&input.target, item) {
        (InputTarget::NewGoal { date_key: a }, NavItem::AddGoal { date_key: b }) => a == b,
        (
            InputTarget::NewSubtask {
                date_key: a,
                goal_id: g,
            },
            NavItem::AddSubtask {
                date_key: b,
                goal_id: h,
            },
        ) => a == b && g == h,
        (
            InputTarget::EditGoal {
                date_key: a,
                goal_id: g,
                ..
            },
            NavItem::Goal {
                date_key: b,
                goal_id: h,
            },
        ) => a == b && g == h,
        (
            InputTarget::EditSubtask {
                date_key: a,
                goal_id: g,
                subtask_id: s,
                ..
            },
            NavItem::Subtask {
                date_key: b,
                goal_id: h,
                subtask_id: t,
            },
        ) => a == b && g == h && s == t,
        _ => false,
    };
    hit.then_some(input)
}

fn nav_item_row(
    app: &App,
    column: &DayColumn<'_>,
    item: &NavItem,
    width: usize,
) -> ListItem<'static> {
    if let Some(input) = input_on(app, item) {
        let indent = match item {
            NavItem::Subtask { .. } | NavItem::AddSubtask { .. } => "    ",
            _ => "",
        };
        let text = if input.field.value.is_empty() {
            format!("{}{} {}", indent, input.field.with_caret(), input.prompt())
        } else {
            format!("{}{}", indent, input.field.with_caret())
        };
        return ListItem::new(truncate_text(&text, width)).style(
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        );
    }
    let goal_of = |goal_id: &str| column.goals.iter().find(|g| g.id == goal_id);
    match item {
        NavItem::Goal { goal_id, .. } => match goal_of(goal_id) {
            Some(goal) => goal_row(
                goal,
                app.expanded
                    .contains(&(column.key.clone(), goal.id.clone())),
                width,
            ),
            None => ListItem::new(""),
        },
        NavItem::Subtask {
            goal_id,
            subtask_id,
            ..
        } => match goal_of(goal_id).and_then(|g| g.find_subtask(subtask_id)) {
            Some(subtask) => subtask_row(subtask, width),
            None => ListItem::new(""),
        },
        NavItem::AddSubtask { .. } => ListItem::new("    + add subtask")
            .style(Style::default().fg(Color::DarkGray)),
        NavItem::AddGoal { .. } => {
            ListItem::new("+ Add a goal...").style(Style::default().fg(Color::DarkGray))
        }
    }
}

fn goal_row(goal: &Goal, expanded: bool, width: usize) -> ListItem<'static> {
    let check = if goal.completed { "[x]" } else { "[ ]" };
    let arrow = if expanded { "▾" } else { "▸" };
    let mut suffix = String::new();
    if !goal.subtasks.is_empty() {
        let done = goal.subtasks.iter().filter(|s| s.completed).count();
        suffix.push_str(&format!(" {}/{}", done, goal.subtasks.len()));
    }
    if goal.recurrence.is_some() {
        suffix.push_str(" ↻");
    }
    let budget = width.saturating_sub(check.len() + 3 + suffix.chars().count());
    let title_style = if goal.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("{} {} ", check, arrow),
            Style::default().fg(if goal.completed {
                Color::Green
            } else {
                Color::Gray
            }),
        ),
        Span::styled(truncate_text(&goal.title, budget), title_style),
        Span::styled(suffix, Style::default().fg(Color::Magenta)),
    ]))
}

fn subtask_row(subtask: &Subtask, width: usize) -> ListItem<'static> {
    let check = if subtask.completed { "[x]" } else { "[ ]" };
    let style = if subtask.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::Gray)
    };
    ListItem::new(Line::from(vec![
        Span::raw(format!("    {} ", check)),
        Span::styled(truncate_text(&subtask.title, width.saturating_sub(8)), style),
    ]))
}

fn draw_month(f: &mut Frame<'_>, app: &App, grid: &MonthGrid<'_>, area: Rect) {
    let block = Block::default()
        .title(Span::styled(
            dates::format_month_year(grid.month),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let weeks = (grid.leading_blanks + grid.days.len() + 6) / 7;
    let mut row_constraints = vec![Constraint::Length(1)];
    row_constraints.extend((0..weeks).map(|_| Constraint::Ratio(1, weeks as u32)));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(inner);

    let week_columns = |area: Rect| {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 7); 7])
            .split(area)
    };

    let heading_cells = week_columns(rows[0]);
    for (idx, heading) in WEEKDAY_HEADINGS.iter().enumerate() {
        f.render_widget(
            Paragraph::new(*heading)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray)),
            heading_cells[idx],
        );
    }

    for (offset, cell) in grid.days.iter().enumerate() {
        let slot = grid.leading_blanks + offset;
        let cells = week_columns(rows[1 + slot / 7]);
        let area = cells[slot % 7];
        let width = area.width.saturating_sub(2) as usize;

        let mut lines = Vec::new();
        for goal in cell.preview() {
            let style = if goal.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(
                truncate_text(&goal.title, width),
                style,
            )));
        }
        if cell.more() > 0 {
            lines.push(Line::from(Span::styled(
                format!("+{} more", cell.more()),
                Style::default().fg(Color::Magenta),
            )));
        }

        let selected = cell.date == app.calendar_cursor;
        let border = if selected {
            Color::LightCyan
        } else if cell.is_today {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let mut title_style = Style::default().fg(if cell.is_today {
            Color::Cyan
        } else {
            Color::Gray
        });
        if selected {
            title_style = title_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
        }
        let block = Block::default()
            .title(Span::styled(format!("{:>2}", cell.date.day()), title_style))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

fn draw_quarter(f: &mut Frame<'_>, app: &App, summary: &QuarterSummary<'_>, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Min(3),
        ])
        .split(area);

    let header = vec![
        Line::from(Span::styled(
            format!(
                "Q{} {}  ({} - {})",
                summary.number,
                summary.start.year(),
                dates::format_short_month(summary.start),
                dates::format_short_month(summary.end)
            ),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("total ", Style::default().fg(Color::Gray)),
            Span::raw(summary.total.to_string()),
            Span::styled("   completed ", Style::default().fg(Color::Gray)),
            Span::styled(summary.completed.to_string(), Style::default().fg(Color::Green)),
            Span::styled("   pending ", Style::default().fg(Color::Gray)),
            Span::styled(
                summary.pending().to_string(),
                Style::default().fg(Color::LightYellow),
            ),
            Span::styled("   progress ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{}%", summary.progress())),
        ]),
    ];
    f.render_widget(
        Paragraph::new(header).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        sections[0],
    );

    let month_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3); 3])
        .split(sections[1]);
    for (idx, stat) in summary.months.iter().enumerate() {
        let selected = app.quarter_row == idx;
        let accent = if selected {
            Color::LightCyan
        } else {
            color_for_index(idx)
        };
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(Span::styled(
                        format!(
                            "{}  {}/{} goals",
                            dates::format_month_year(stat.month),
                            stat.completed,
                            stat.total
                        ),
                        Style::default().fg(accent).add_modifier(if selected {
                            Modifier::BOLD | Modifier::UNDERLINED
                        } else {
                            Modifier::BOLD
                        }),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent)),
            )
            .gauge_style(Style::default().fg(accent).bg(Color::Rgb(22, 24, 30)))
            .percent(stat.progress.min(100) as u16)
            .label(format!("{}%", stat.progress));
        f.render_widget(gauge, month_rows[idx]);
    }

    let items = if summary.recent.is_empty() {
        vec![ListItem::new("Nothing pending recently")]
    } else {
        summary
            .recent
            .iter()
            .map(|recent| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<12}", dates::format_day(recent.date)),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::raw(recent.goal.title.clone()),
                ]))
            })
            .collect()
    };
    let mut state = ListState::default();
    if app.quarter_row >= 3 && !summary.recent.is_empty() {
        state.select(Some(app.quarter_row - 3));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(
                    "Recent pending",
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, sections[2], &mut state);
}

fn draw_year(f: &mut Frame<'_>, app: &App, grid: &YearGrid, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);
    for (idx, month) in grid.months.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(rows[idx / 4]);

        let mut lines = vec![Line::from(
            WEEKDAY_HEADINGS
                .iter()
                .map(|h| Span::styled(format!("{:>3}", h), Style::default().fg(Color::Gray)))
                .collect::<Vec<_>>(),
        )];
        let mut spans = vec![Span::raw("   "); month.leading_blanks];
        for day in &month.days {
            let mut style = if day.all_complete {
                Style::default().fg(Color::Green)
            } else if day.has_goals {
                Style::default().fg(Color::LightYellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if day.is_today {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            if day.date == app.calendar_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{:>3}", day.date.day()), style));
            if spans.len() == 7 {
                lines.push(Line::from(std::mem::take(&mut spans)));
            }
        }
        if !spans.is_empty() {
            lines.push(Line::from(spans));
        }

        let current = month.month.month() == app.calendar_cursor.month()
            && month.month.year() == app.calendar_cursor.year();
        let block = Block::default()
            .title(Span::styled(
                dates::format_short_month(month.month),
                Style::default()
                    .fg(if current { Color::Cyan } else { Color::Yellow })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if current {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        f.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(block),
            cells[idx % 4],
        );
    }
}

fn draw_overview(f: &mut Frame<'_>, app: &App, overview: &Overview<'_>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let lists = [
        ("Pending", &overview.pending, Color::LightYellow),
        ("Done", &overview.done, Color::Green),
    ];
    for (idx, (title, items, accent)) in lists.into_iter().enumerate() {
        let focused = app.focus.current_column() == Some(idx);
        let width = chunks[idx].width.saturating_sub(2) as usize;
        let rows = if items.is_empty() {
            vec![ListItem::new("No goals")]
        } else {
            items
                .iter()
                .map(|item| overview_row(item, width))
                .collect()
        };
        let mut state = ListState::default();
        if let crate::focus::Focus::Focused { column, item } = app.focus.focus() {
            if column == idx && !items.is_empty() {
                let viewport_rows = chunks[idx].height.saturating_sub(2) as usize;
                *state.offset_mut() = adjust_offset(item, 0, viewport_rows, 1, items.len());
                state.select(Some(item));
            }
        }
        let block = Block::default()
            .title(Span::styled(
                format!("{} ({})", title, items.len()),
                Style::default()
                    .fg(if focused { Color::Cyan } else { accent })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        let list = List::new(rows).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, chunks[idx], &mut state);
    }
}

fn overview_row(item: &OverviewItem<'_>, width: usize) -> ListItem<'static> {
    let label = match item.date {
        Some(date) => dates::format_day(date),
        None => item.key.to_string(),
    };
    let budget = width.saturating_sub(14);
    ListItem::new(Line::from(vec![
        Span::styled(format!("{:<13} ", label), Style::default().fg(Color::Gray)),
        Span::raw(truncate_text(&item.goal.title, budget)),
    ]))
}

fn draw_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(area);

    let help_bar = Paragraph::new(footer_help_line(app))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(help_bar, rows[0]);

    let status = Paragraph::new(app.status.clone())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(status, rows[1]);
}

fn footer_help_line(app: &App) -> Line<'static> {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::LightCyan));
    if let Mode::Input(_) = app.mode {
        return Line::from(vec![
            key("Enter/Tab"),
            Span::raw(" save  "),
            key("Esc"),
            Span::raw(" cancel"),
        ]);
    }
    let mut spans = vec![
        key("t d w m q y o"),
        Span::raw(" views  "),
        key("[ ]"),
        Span::raw(" page  "),
        key("n"),
        Span::raw(" new goal  "),
    ];
    match app.view {
        View::Today | View::Day | View::Week => spans.extend([
            key("←↑↓→ / h j k l"),
            Span::raw(" move  "),
            key("Enter"),
            Span::raw(" open  "),
            key("space"),
            Span::raw(" done  "),
            key("e"),
            Span::raw(" edit  "),
            key("x"),
            Span::raw(" delete  "),
            key("J K < >"),
            Span::raw(" drag  "),
        ]),
        View::Month | View::Year => spans.extend([
            key("←↑↓→"),
            Span::raw(" pick day  "),
            key("Enter"),
            Span::raw(" open day  "),
            key("a"),
            Span::raw(" add  "),
        ]),
        View::Quarter => spans.extend([
            key("↑↓"),
            Span::raw(" select  "),
            key("Enter"),
            Span::raw(" open  "),
        ]),
        View::Overview => spans.extend([
            key("←↑↓→"),
            Span::raw(" move  "),
            key("space"),
            Span::raw(" done  "),
            key("Enter"),
            Span::raw(" open day  "),
        ]),
    }
    spans.extend([key("s"), Span::raw(" settings  "), key("Q"), Span::raw(" quit")]);
    Line::from(spans)
}

fn is_path_input(target: &InputTarget) -> bool {
    matches!(
        target,
        InputTarget::ExportPath | InputTarget::ImportPath | InputTarget::BackgroundPath
    )
}

fn draw_settings(f: &mut Frame<'_>, app: &App, selected: usize) {
    let area = centered_rect(60, 50, f.size());
    let mut lines = Vec::new();
    for (idx, item) in SETTINGS_ITEMS.iter().enumerate() {
        let style = if idx == selected {
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(format!(" {} ", item.label()), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("goals: {}", app.storage.goals_path().display()),
        Style::default().fg(Color::DarkGray),
    )));
    if let Some(path) = app.storage.background() {
        lines.push(Line::from(Span::styled(
            format!("background: {}", path.display()),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(Span::styled(
        "↑↓ select • Enter run • Esc close",
        Style::default().fg(Color::Gray),
    )));
    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(
                    "Settings",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_path_input(f: &mut Frame<'_>, input: &InlineInput) {
    let area = centered_rect(70, 20, f.size());
    let lines = vec![
        Line::from(Span::styled(
            input.field.with_caret(),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to confirm • Esc to cancel",
            Style::default().fg(Color::Gray),
        )),
    ];
    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(
                    input.prompt(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_notice(f: &mut Frame<'_>, message: &str) {
    let area = centered_rect(50, 30, f.size());
    let failed = message.starts_with("Error");
    let accent = if failed { Color::LightRed } else { Color::LightGreen };
    let body = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press any key to continue"),
    ];
    let dialog = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    "Notice",
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent)),
        );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::LightBlue,
        Color::LightGreen,
        Color::LightMagenta,
        Color::Cyan,
        Color::LightYellow,
        Color::LightRed,
        Color::Blue,
    ];
    palette[idx % palette.len()]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
