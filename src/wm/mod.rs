//! Windowed compositor on a linear framebuffer (spec.md §4.11). Only
//! reachable when [`crate::boot::read`] found a bootinfo record with a
//! framebuffer; otherwise `kernel_main` falls back to [`crate::shell`] on
//! the VGA text buffer (spec.md §6).

pub mod compositor;
pub mod framebuffer;
pub mod window;

use crate::boot::BootInfo;
use crate::config::SYSINFO_REDRAW_TICKS;
use crate::events::{self, Event};
use framebuffer::Framebuffer;
use window::WindowTable;

/// Runs the window manager's main loop. Does not return; driven entirely
/// by polling [`crate::events::poll`], matching the teacher's preference
/// for a plain blocking loop over an async executor once there's no
/// cooperative scheduling left to do.
pub fn run(info: BootInfo) -> ! {
    // SAFETY: `info` describes a framebuffer the bootloader mapped and
    // handed off exclusively to this kernel.
    let mut fb = unsafe { Framebuffer::new(info) };
    let mut windows = WindowTable::new();
    windows.spawn_system_info();
    windows.spawn_welcome();

    let mut cursor = (i32::from(fb.width() as u16) / 2, i32::from(fb.height() as u16) / 2);
    let mut last_sysinfo_redraw = 0u64;

    loop {
        while let Some(event) = events::poll() {
            match event {
                Event::MouseMove { dx, dy } => {
                    cursor.0 = (cursor.0 + dx).clamp(0, fb.width() as i32 - 1);
                    cursor.1 = (cursor.1 + dy).clamp(0, fb.height() as i32 - 1);
                    windows.drag_active(cursor, fb.width(), fb.height());
                }
                Event::MouseButton(buttons) => {
                    windows.handle_click(cursor, buttons, fb.width(), fb.height());
                }
                Event::Key(byte) => {
                    windows.handle_key(byte);
                }
                Event::Timer => {}
            }
        }

        let now = crate::process::uptime_ticks();
        if now.wrapping_sub(last_sysinfo_redraw) >= u64::from(SYSINFO_REDRAW_TICKS) {
            last_sysinfo_redraw = now;
            windows.refresh_system_info(
                now,
                crate::memory::pmm::free_pages(),
                crate::memory::pmm::total_pages(),
                (fb.width(), fb.height()),
                cursor,
            );
        }

        compositor::composite(&mut fb, &windows, cursor, now);
        crate::arch::regs::hlt();
    }
}
