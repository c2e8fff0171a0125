//! Window table and z-order (spec.md §4.11).

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::config::{MAX_WINDOWS, TASKBAR_HEIGHT, TITLE_BAR_HEIGHT, WINDOW_BORDER};

use super::framebuffer::{font_glyph, Color};

/// Size, in pixels, of the close glyph's hit region in the title bar's
/// top-right corner (spec.md §4.11).
const CLOSE_REGION: i32 = 16;

/// Minimum number of pixels of a dragged window that must stay on-screen
/// (spec.md §4.11).
const DRAG_MARGIN: i32 = 40;

/// One open window, with its own heap-backed content buffer (spec.md §3,
/// §4.11) so pixel writes touch only that window's memory; the compositor
/// blits this buffer into the window's content region once per frame.
pub struct Window {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub content_w: i32,
    pub content_h: i32,
    pub content: Vec<Color>,
    pub dragging: bool,
    pub focused: bool,
    pub visible: bool,
    pub dirty: bool,
    drag_offset: (i32, i32),
}

impl Window {
    fn new(title: &str, x: i32, y: i32, width: i32, height: i32) -> Self {
        let border = WINDOW_BORDER as i32;
        let content_w = (width - 2 * border).max(0);
        let content_h = (height - TITLE_BAR_HEIGHT as i32 - border).max(0);
        Self {
            title: String::from(title),
            x,
            y,
            width,
            height,
            content_w,
            content_h,
            content: vec![Color::WINDOW_BG; (content_w * content_h) as usize],
            dragging: false,
            focused: false,
            visible: true,
            dirty: true,
            drag_offset: (0, 0),
        }
    }

    fn contains_title_bar(&self, point: (i32, i32)) -> bool {
        point.0 >= self.x
            && point.0 < self.x + self.width
            && point.1 >= self.y
            && point.1 < self.y + TITLE_BAR_HEIGHT as i32
    }

    fn contains_close_button(&self, point: (i32, i32)) -> bool {
        let close_x = self.x + self.width - CLOSE_REGION;
        point.0 >= close_x
            && point.0 < self.x + self.width
            && point.1 >= self.y
            && point.1 < self.y + CLOSE_REGION
    }

    /// Fills the content buffer with a solid color.
    fn fill_content(&mut self, color: Color) {
        self.content.fill(color);
        self.dirty = true;
    }

    fn put_content_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.content_w || y >= self.content_h {
            return;
        }
        let index = (y * self.content_w + x) as usize;
        self.content[index] = color;
        self.dirty = true;
    }

    fn draw_text_content(&mut self, x: i32, y: i32, text: &str, color: Color) {
        for (i, ch) in text.bytes().enumerate() {
            let glyph = font_glyph(ch);
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..8 {
                    if bits & (0x80 >> col) != 0 {
                        self.put_content_pixel(x + i as i32 * 8 + col as i32, y + row as i32, color);
                    }
                }
            }
        }
    }
}

/// The set of open windows and their front-to-back stacking order. `order`
/// holds indices into `windows`, front-most last (so compositing it last
/// draws it on top). A destroyed window leaves its slot `None`; `spawn`
/// reuses the first free slot before growing `windows`, so repeated
/// create/destroy cycles never permanently shrink capacity below
/// [`MAX_WINDOWS`] (spec.md §8's create/destroy round-trip property).
pub struct WindowTable {
    pub windows: Vec<Option<Window>>,
    pub order: Vec<usize>,
    active_drag: Option<usize>,
}

impl WindowTable {
    pub fn new() -> Self {
        Self {
            windows: Vec::new(),
            order: Vec::new(),
            active_drag: None,
        }
    }

    fn spawn(&mut self, title: &str, x: i32, y: i32, width: i32, height: i32) -> Option<usize> {
        if let Some(index) = self.windows.iter().position(Option::is_none) {
            self.windows[index] = Some(Window::new(title, x, y, width, height));
            self.order.push(index);
            return Some(index);
        }
        if self.windows.len() >= MAX_WINDOWS {
            return None;
        }
        let index = self.windows.len();
        self.windows.push(Some(Window::new(title, x, y, width, height)));
        self.order.push(index);
        Some(index)
    }

    pub fn spawn_welcome(&mut self) {
        if let Some(index) = self.spawn("Welcome", 80, 60, 260, 140) {
            if let Some(Some(window)) = self.windows.get_mut(index) {
                window.draw_text_content(6, 6, "This kernel's desktop.", Color::BLACK);
                window.draw_text_content(6, 16, "Drag by the title bar.", Color::BLACK);
            }
        }
    }

    pub fn spawn_system_info(&mut self) {
        self.spawn("System Info", 380, 60, 220, 120);
    }

    /// Repaints the "System Info" window's content buffer (spec.md §4.11's
    /// timer-driven background work).
    pub fn refresh_system_info(
        &mut self,
        ticks: u64,
        free_pages: usize,
        total_pages: usize,
        display: (u32, u32),
        cursor: (i32, i32),
    ) {
        let window_count = self.windows.iter().filter(|w| w.is_some()).count();
        let process_count = crate::process::count_active();
        let window = self
            .order
            .iter()
            .filter_map(|&i| self.windows[i].as_mut())
            .find(|w| w.title == "System Info");
        if let Some(window) = window {
            window.fill_content(Color::WINDOW_BG);
            let seconds = ticks / u64::from(crate::config::TIMER_HZ);
            let lines = [
                alloc::format!("uptime: {seconds}s"),
                alloc::format!("free mem: {} KiB", free_pages * 4),
                alloc::format!("total mem: {} KiB", total_pages * 4),
                alloc::format!("heap used: {} B", crate::memory::heap::used_bytes()),
                alloc::format!("processes: {process_count}"),
                alloc::format!("display: {}x{}", display.0, display.1),
                alloc::format!("mouse: ({}, {})", cursor.0, cursor.1),
                alloc::format!("windows: {window_count}"),
            ];
            for (i, line) in lines.iter().enumerate() {
                window.draw_text_content(6, 6 + i as i32 * 10, line, Color::BLACK);
            }
        }
    }

    fn focus(&mut self, target: usize) {
        for window in self.windows.iter_mut().flatten() {
            window.focused = false;
        }
        if let Some(Some(window)) = self.windows.get_mut(target) {
            window.focused = true;
        }
    }

    /// Index of the taskbar button under `point`, if the click landed in
    /// the taskbar strip at all. Buttons are laid out left to right, one
    /// per open window, in z-order.
    fn taskbar_hit(&self, point: (i32, i32), screen_width: i32, screen_height: i32) -> Option<usize> {
        let bar_y = screen_height - TASKBAR_HEIGHT as i32;
        if point.1 < bar_y {
            return None;
        }
        let count = self.order.len();
        if count == 0 {
            return None;
        }
        let button_width = (screen_width / count as i32).max(1);
        let slot = (point.0 / button_width) as usize;
        self.order.get(slot).copied()
    }

    /// Front-to-back hit testing (spec.md §4.11): taskbar button first,
    /// then the topmost window containing the cursor (close region, then
    /// title-bar drag start, then just focus).
    pub fn handle_click(&mut self, point: (i32, i32), buttons: u8, screen_width: u32, screen_height: u32) {
        const LEFT_BUTTON: u8 = 0b001;
        if buttons & LEFT_BUTTON == 0 {
            if let Some(index) = self.active_drag.take() {
                if let Some(Some(window)) = self.windows.get_mut(index) {
                    window.dragging = false;
                }
            }
            return;
        }

        if let Some(index) = self.taskbar_hit(point, screen_width as i32, screen_height as i32) {
            self.focus(index);
            return;
        }

        for depth in (0..self.order.len()).rev() {
            let index = self.order[depth];
            let Some(Some(window)) = self.windows.get(index) else {
                continue;
            };
            if window.contains_close_button(point) {
                // Dropping the `Window` here frees its content buffer back
                // to the heap; leaving the slot `None` lets `spawn` reuse
                // it instead of growing `windows` further.
                self.windows[index] = None;
                self.order.remove(depth);
                if let Some(&top) = self.order.last() {
                    self.focus(top);
                }
                return;
            }
            if window.contains_title_bar(point) {
                self.order.remove(depth);
                self.order.push(index);
                self.focus(index);
                if let Some(Some(window)) = self.windows.get_mut(index) {
                    window.dragging = true;
                    window.drag_offset = (point.0 - window.x, point.1 - window.y);
                }
                self.active_drag = Some(index);
                return;
            }
        }
    }

    /// Moves the window currently being dragged, if any, to follow
    /// `point`, clamped so at least [`DRAG_MARGIN`] px stay on-screen and
    /// the title bar stays above the taskbar (spec.md §4.11).
    pub fn drag_active(&mut self, point: (i32, i32), screen_width: u32, screen_height: u32) {
        if let Some(index) = self.active_drag {
            if let Some(Some(window)) = self.windows.get_mut(index) {
                let min_x = DRAG_MARGIN - window.width;
                let max_x = screen_width as i32 - DRAG_MARGIN;
                let min_y = 0;
                let max_y = screen_height as i32 - TASKBAR_HEIGHT as i32 - TITLE_BAR_HEIGHT as i32;
                window.x = (point.0 - window.drag_offset.0).clamp(min_x, max_x);
                window.y = (point.1 - window.drag_offset.1).clamp(min_y, max_y);
            }
        }
    }

    /// Routes a keypress to the front-most window (currently informational
    /// only; no window reads keyboard input back).
    pub fn handle_key(&mut self, _byte: u8) {}
}
