//! Per-frame compositing order (spec.md §4.11): desktop gradient, then
//! each window back-to-front (shadow, border, title bar, content), then
//! the taskbar and clock, then the cursor, then a single blit of the
//! back-buffer to the live framebuffer.

use alloc::format;

use crate::config::{TASKBAR_HEIGHT, TITLE_BAR_HEIGHT, WINDOW_BORDER};

use super::framebuffer::{Color, Framebuffer};
use super::window::{Window, WindowTable};

const SHADOW_OFFSET: i32 = 6;

/// Two-tone 12x19 cursor bitmap (spec.md §4.11(d)): 0 transparent, 1
/// outline, 2 fill.
const CURSOR_BITMAP: [[u8; 12]; 19] = [
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 2, 2, 1, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 2, 2, 2, 1, 0, 0, 0, 0, 0, 0],
    [1, 2, 2, 2, 2, 2, 1, 0, 0, 0, 0, 0],
    [1, 2, 2, 2, 2, 2, 2, 1, 0, 0, 0, 0],
    [1, 2, 2, 2, 2, 2, 2, 2, 1, 0, 0, 0],
    [1, 2, 2, 2, 2, 2, 2, 2, 2, 1, 0, 0],
    [1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 0],
    [1, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1],
    [1, 2, 2, 2, 1, 2, 2, 1, 0, 0, 0, 0],
    [1, 2, 2, 1, 0, 1, 2, 2, 1, 0, 0, 0],
    [1, 2, 1, 0, 0, 1, 2, 2, 1, 0, 0, 0],
    [1, 1, 0, 0, 0, 0, 1, 2, 2, 1, 0, 0],
    [1, 0, 0, 0, 0, 0, 1, 2, 2, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 1, 2, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0],
];

/// Renders one frame into `fb`'s back-buffer, then blits it to the live
/// framebuffer in a single pass (spec.md §4.11(e)).
pub fn composite(fb: &mut Framebuffer, windows: &WindowTable, cursor: (i32, i32), uptime_ticks: u64) {
    fb.fill_gradient(Color::DESKTOP_TOP, Color::DESKTOP_BOTTOM);

    for &index in &windows.order {
        if let Some(Some(window)) = windows.windows.get(index) {
            draw_window(fb, window, window.focused);
        }
    }

    draw_taskbar(fb, windows, uptime_ticks);
    draw_cursor(fb, cursor);

    fb.blit();
}

fn draw_window(fb: &mut Framebuffer, window: &Window, active: bool) {
    fb.fill_rect(
        window.x + SHADOW_OFFSET,
        window.y + SHADOW_OFFSET,
        window.width,
        window.height,
        Color::SHADOW,
    );

    let border = WINDOW_BORDER as i32;
    fb.fill_rect(
        window.x - border,
        window.y - border,
        window.width + border * 2,
        window.height + border * 2,
        Color::BORDER,
    );

    let title_color = if active {
        Color::TITLE_BAR
    } else {
        Color::TITLE_BAR_INACTIVE
    };
    fb.fill_rect(window.x, window.y, window.width, TITLE_BAR_HEIGHT as i32, title_color);
    fb.draw_text(window.x + 6, window.y + 6, &window.title, Color::WHITE);

    let close_x = window.x + window.width - TITLE_BAR_HEIGHT as i32;
    fb.fill_rect(close_x, window.y, TITLE_BAR_HEIGHT as i32, TITLE_BAR_HEIGHT as i32, Color::BORDER);
    fb.draw_text(close_x + 5, window.y + 6, "X", Color::WHITE);

    // Blit this window's own content buffer into its content region,
    // rather than drawing text straight into the shared framebuffer.
    let content_x = window.x + border;
    let content_y = window.y + TITLE_BAR_HEIGHT as i32;
    for row in 0..window.content_h {
        for col in 0..window.content_w {
            let color = window.content[(row * window.content_w + col) as usize];
            fb.put_pixel(content_x + col, content_y + row, color);
        }
    }
}

fn draw_taskbar(fb: &mut Framebuffer, windows: &WindowTable, uptime_ticks: u64) {
    let width = fb.width() as i32;
    let height = fb.height() as i32;
    let bar_y = height - TASKBAR_HEIGHT as i32;
    fb.fill_rect(0, bar_y, width, TASKBAR_HEIGHT as i32, Color::TASKBAR);

    let count = windows.order.len();
    if count > 0 {
        let button_width = width / count as i32;
        for (slot, &index) in windows.order.iter().enumerate() {
            if let Some(Some(window)) = windows.windows.get(index) {
                let button_x = slot as i32 * button_width;
                if window.focused {
                    fb.fill_rect(button_x, bar_y, button_width, TASKBAR_HEIGHT as i32, Color::TITLE_BAR);
                }
                fb.draw_text(button_x + 4, bar_y + 8, &window.title, Color::WHITE);
            }
        }
    }

    let seconds = uptime_ticks / u64::from(crate::config::TIMER_HZ);
    let minutes = seconds / 60;
    let clock = format!("{:02}:{:02}:{:02}", (minutes / 60) % 24, minutes % 60, seconds % 60);
    fb.draw_text(fb.width() as i32 - 8 * clock.len() as i32 - 8, bar_y + 8, &clock, Color::WHITE);
}

fn draw_cursor(fb: &mut Framebuffer, cursor: (i32, i32)) {
    for (dy, row) in CURSOR_BITMAP.iter().enumerate() {
        for (dx, &pixel) in row.iter().enumerate() {
            let color = match pixel {
                1 => Color::BLACK,
                2 => Color::WHITE,
                _ => continue,
            };
            fb.put_pixel(cursor.0 + dx as i32, cursor.1 + dy as i32, color);
        }
    }
}
