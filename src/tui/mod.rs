// src/tui/mod.rs
use crate::types::{Command, CoreSnapshot, Side, UiEvent};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Sparkline, Table, Tabs},
    Terminal,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{io, time::Duration};
use tokio::sync::mpsc;

const MAX_NOTICES: usize = 20;

pub struct App {
    snapshot: Option<CoreSnapshot>,
    notices: Vec<String>,
    reset_armed: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            notices: Vec::new(),
            reset_armed: false,
        }
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Snapshot(snapshot) => self.snapshot = Some(snapshot),
            UiEvent::Notice(message) => self.push_notice(message),
        }
    }

    fn push_notice(&mut self, message: String) {
        self.notices.push(message);
        if self.notices.len() > MAX_NOTICES {
            self.notices.remove(0);
        }
    }

    /// Maps a keypress to a core command. Reset is destructive and wants
    /// the key pressed twice in a row.
    pub fn on_key(&mut self, code: KeyCode) -> Option<Command> {
        if let KeyCode::Char('R') = code {
            if self.reset_armed {
                self.reset_armed = false;
                return Some(Command::Reset);
            }
            self.reset_armed = true;
            self.push_notice("press R again to confirm account reset".to_string());
            return None;
        }
        self.reset_armed = false;

        match code {
            KeyCode::Char('l') => Some(Command::OpenTrade(Side::Long)),
            KeyCode::Char('s') => Some(Command::OpenTrade(Side::Short)),
            KeyCode::Char('c') => Some(Command::CloseTrade),
            KeyCode::Char('x') => Some(Command::ClearHistory),
            KeyCode::Char(digit @ '1'..='9') => {
                self.select_instrument(digit as usize - '1' as usize)
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_leverage(1),
            KeyCode::Char('-') => self.adjust_leverage(-1),
            KeyCode::Char('[') => self.adjust_limits(dec!(-1), Decimal::ZERO),
            KeyCode::Char(']') => self.adjust_limits(dec!(1), Decimal::ZERO),
            KeyCode::Char('{') => self.adjust_limits(Decimal::ZERO, dec!(-1)),
            KeyCode::Char('}') => self.adjust_limits(Decimal::ZERO, dec!(1)),
            _ => None,
        }
    }

    fn select_instrument(&self, index: usize) -> Option<Command> {
        let snapshot = self.snapshot.as_ref()?;
        snapshot
            .quotes
            .get(index)
            .map(|quote| Command::SelectInstrument(quote.symbol.clone()))
    }

    fn adjust_leverage(&self, delta: i64) -> Option<Command> {
        let snapshot = self.snapshot.as_ref()?;
        let next = (snapshot.leverage as i64 + delta).max(1) as u32;
        Some(Command::SetLeverage(next))
    }

    fn adjust_limits(&self, stop_delta: Decimal, profit_delta: Decimal) -> Option<Command> {
        let snapshot = self.snapshot.as_ref()?;
        Some(Command::SetRiskLimits {
            stop_loss: (snapshot.stop_loss_percent + stop_delta).max(Decimal::ZERO),
            take_profit: (snapshot.take_profit_percent + profit_delta).max(Decimal::ZERO),
        })
    }
}

pub async fn run(
    mut rx: mpsc::Receiver<UiEvent>,
    commands: mpsc::Sender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let KeyCode::Char('q') = key.code {
                        break;
                    }
                    if let Some(command) = app.on_key(key.code) {
                        let _ = commands.try_send(command);
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            app.on_event(event);
        }
    }

    let _ = commands.try_send(Command::Quit);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
                Constraint::Length(9),
                Constraint::Length(6),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let Some(snapshot) = app.snapshot.as_ref() else {
        let waiting = Paragraph::new("Waiting for market data...")
            .block(Block::default().borders(Borders::ALL).title("marginsim"));
        f.render_widget(waiting, chunks[0]);
        return;
    };

    render_header(f, app, snapshot, chunks[0]);
    render_quotes(f, snapshot, chunks[1]);
    render_chart(f, snapshot, chunks[2]);
    render_position(f, snapshot, chunks[3]);
    render_history(f, snapshot, chunks[4]);
    render_notices(f, app, chunks[5]);
    render_help(f, chunks[6]);
}

fn signed_style(value: Decimal) -> Style {
    if value < Decimal::ZERO {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    }
}

fn limit_label(value: Decimal) -> String {
    if value.is_zero() {
        "off".to_string()
    } else {
        format!("{value}%")
    }
}

fn render_header(f: &mut ratatui::Frame, app: &App, snapshot: &CoreSnapshot, area: ratatui::layout::Rect) {
    let mut spans = vec![
        Span::raw("Balance: "),
        Span::styled(
            format!("{:.2}", snapshot.balance),
            signed_style(snapshot.balance).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  Leverage: {}x", snapshot.leverage)),
        Span::raw(format!(
            "  SL: {}  TP: {}",
            limit_label(snapshot.stop_loss_percent),
            limit_label(snapshot.take_profit_percent)
        )),
    ];
    if app.reset_armed {
        spans.push(Span::styled(
            "  [R again to RESET]",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Account"));
    f.render_widget(header, area);
}

fn render_quotes(f: &mut ratatui::Frame, snapshot: &CoreSnapshot, area: ratatui::layout::Rect) {
    let titles: Vec<Line> = snapshot
        .quotes
        .iter()
        .map(|q| Line::from(format!("{} {:.2}", q.symbol, q.price)))
        .collect();
    let selected = snapshot
        .quotes
        .iter()
        .position(|q| q.symbol == snapshot.selected)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title("Instruments"));
    f.render_widget(tabs, area);
}

fn render_chart(f: &mut ratatui::Frame, snapshot: &CoreSnapshot, area: ratatui::layout::Rect) {
    let points = sparkline_points(&snapshot.chart);
    let chart = Sparkline::default()
        .data(&points)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} price", snapshot.selected)),
        );
    f.render_widget(chart, area);
}

/// Rescales the window to 0..=100 so small moves on a large base price
/// stay visible.
fn sparkline_points(window: &[Decimal]) -> Vec<u64> {
    let Some(min) = window.iter().min().copied() else {
        return Vec::new();
    };
    let max = window.iter().max().copied().unwrap_or(min);
    if max == min {
        return vec![50; window.len()];
    }
    window
        .iter()
        .map(|p| {
            ((*p - min) * dec!(100) / (max - min))
                .to_u64()
                .unwrap_or(0)
        })
        .collect()
}

fn render_position(f: &mut ratatui::Frame, snapshot: &CoreSnapshot, area: ratatui::layout::Rect) {
    let content = match (&snapshot.position, &snapshot.unrealized) {
        (Some(position), Some(pnl)) => Line::from(vec![
            Span::styled(
                format!("{} ", position.side),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "{} @ {} qty {}  PnL: ",
                position.symbol, position.entry_price, position.quantity
            )),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", pnl.profit, pnl.percent),
                signed_style(pnl.profit).add_modifier(Modifier::BOLD),
            ),
        ]),
        _ => Line::from("flat"),
    };

    let position = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title("Position"));
    f.render_widget(position, area);
}

fn render_history(f: &mut ratatui::Frame, snapshot: &CoreSnapshot, area: ratatui::layout::Rect) {
    let rows: Vec<Row> = snapshot
        .history
        .iter()
        .map(|trade| {
            Row::new(vec![
                trade.side.to_string(),
                trade.symbol.clone(),
                trade.entry_price.to_string(),
                trade.exit_price.to_string(),
                format!("{:+}", trade.profit),
                format!("{:+}%", trade.profit_percent),
                trade.closed_at.format("%H:%M:%S").to_string(),
            ])
            .style(signed_style(trade.profit))
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(9),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Side", "Symbol", "Entry", "Exit", "Profit", "%", "Closed"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Trade History"));
    f.render_widget(table, area);
}

fn render_notices(f: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let notices: Vec<ListItem> = app
        .notices
        .iter()
        .rev()
        .map(|n| ListItem::new(Line::from(Span::raw(n.clone()))))
        .collect();

    let list =
        List::new(notices).block(Block::default().borders(Borders::ALL).title("Notices"));
    f.render_widget(list, area);
}

fn render_help(f: &mut ratatui::Frame, area: ratatui::layout::Rect) {
    let help = Paragraph::new(
        "q quit | l long | s short | c close | 1-9 instrument | +/- leverage | [ ] SL | { } TP | x clear history | R reset",
    )
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(help, area);
}
