//! Test that a ring-3 fault terminates only the faulting process and
//! leaves the kernel thread running (spec.md §4.12, §8 scenario 3).
//!
//! This kernel has no IST / double-fault-safe-stack mechanism (its GDT
//! carries a single TSS with one `esp0`, spec.md §4.1), so a genuine
//! kernel-mode stack overflow would double-fault and is not something this
//! test can safely provoke. A ring-3 null-pointer write is the fault path
//! spec.md actually specifies a recovery policy for, so that's what this
//! exercises instead.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use myos_rust::{exit_qemu, process, serial_print, serial_println, QemuExitCode};

/// Ring-3 entry point that immediately faults on a null-pointer write.
extern "C" fn crash_entry() -> ! {
    // SAFETY: this is expected to page-fault; that is the point of the test.
    unsafe {
        core::ptr::write_volatile(core::ptr::null_mut::<u8>(), 1);
    }
    loop {
        myos_rust::arch::regs::hlt();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    serial_print!("stack_overflow::ring3_fault_terminates_process...\t");

    // SAFETY: first and only thing this test binary does.
    unsafe { myos_rust::kernel_init() };

    process::spawn_user("crash", crash_entry as u32).expect("failed to spawn crashing process");

    // Two processes are now runnable: the kernel thread (this code) and
    // `crash`. The timer preempts this thread into `crash` within one
    // quantum; `crash` faults, `exceptions::handle` terminates it, and the
    // scheduler switches back here. Poll until only the kernel thread is
    // left.
    loop {
        if process::count_active() == 1 {
            break;
        }
        myos_rust::arch::regs::hlt();
    }

    serial_println!("[ok]");
    exit_qemu(QemuExitCode::Success);

    #[expect(
        clippy::empty_loop,
        reason = "Endless loop when test finish. It should not be possible as we exit_qemu before."
    )]
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    myos_rust::test_panic_handler(info)
}
