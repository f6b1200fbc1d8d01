use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line("Ctrl-C", 6, "Quit"),
        key_line("F1", 10, "Toggle this help"),
        key_line("Enter", 7, "Confirm / create project"),
        key_line("Esc", 9, "Back (quit on the first screen)"),
        Line::from(""),
        Line::from("Project form:"),
        key_line("Tab/↓", 7, "Next field"),
        key_line("S-Tab/↑", 5, "Previous field"),
        key_line("←/→", 9, "Change orientation, resolution or frame rate"),
        key_line("Space", 7, "Toggle orientation / frame rate"),
        Line::from(""),
        Line::from("While waiting for Premiere:"),
        key_line("Esc", 9, "Stop waiting (Premiere keeps running)"),
        Line::from(""),
        Line::from("Templates are looked up as <resolution>_<fps>.prproj"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
