//! Integration test for user space execution.
//!
//! Boots the kernel, spawns the baked-in ring-3 demo program, and verifies
//! that it runs to completion through the syscall gate (`sys_write`,
//! `sys_exit`) without faulting and without ever touching the kernel
//! thread's own process slot.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(myos_rust::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![allow(missing_docs)]

use core::panic::PanicInfo;

use myos_rust::{gdt, process, serial_println};

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    // SAFETY: first and only thing this test binary does.
    unsafe { myos_rust::kernel_init() };

    test_main();

    loop {
        myos_rust::arch::regs::hlt();
    }
}

/// Selectors used to build a ring-3 `iretd` frame must actually carry
/// RPL 3, and the kernel/user code selectors must differ, or every user
/// process would silently run at ring 0.
#[test_case]
fn test_user_selectors_carry_ring3() {
    assert_eq!(gdt::USER_CODE_SELECTOR & 0b11, 3, "user code selector must have RPL 3");
    assert_eq!(gdt::USER_DATA_SELECTOR & 0b11, 3, "user data selector must have RPL 3");
    assert_ne!(gdt::KERNEL_CODE_SELECTOR, gdt::USER_CODE_SELECTOR);
}

/// Spawning the baked-in demo program should land it in the process table
/// as a ring-3, `Ready` entry distinct from the kernel thread. Checked
/// with interrupts held off so the timer can't preempt into (and
/// complete) the new process before the assertions run.
#[test_case]
fn test_spawn_user_registers_ring3_process() {
    let slot = myos_rust::arch::regs::without_interrupts(|| {
        let before = process::count_active();
        let slot = process::spawn_user("demo", myos_rust::userdemo::entry as u32)
            .expect("failed to spawn demo user process");
        assert_eq!(process::count_active(), before + 1);

        let spawned = process::list()
            .into_iter()
            .find(|task| task.id == slot)
            .expect("spawned process missing from process::list()");
        assert!(spawned.is_user, "demo process must be marked ring-3");
        assert_eq!(spawned.name, "demo");
        slot
    });

    // Let it actually run to completion so it doesn't linger as a stray
    // `Ready` entry for later tests in this binary.
    loop {
        if process::list().iter().all(|task| task.id != slot) {
            break;
        }
        myos_rust::arch::regs::hlt();
    }

    serial_println!("[ok] demo process spawned and exited in slot {slot}");
}

/// Running the demo process to completion (`sys_write` then `sys_exit`)
/// must return its slot to the pool and must not disturb the kernel
/// thread's own slot 0.
#[test_case]
fn test_user_process_exits_cleanly() {
    let slot = process::spawn_user("demo-exit", myos_rust::userdemo::entry as u32)
        .expect("failed to spawn demo user process");

    loop {
        if process::list().iter().all(|task| task.id != slot) {
            break;
        }
        myos_rust::arch::regs::hlt();
    }

    assert_eq!(process::count_active(), 1, "only the kernel thread should remain runnable");
    serial_println!("[ok] demo process exited cleanly");
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    myos_rust::test_panic_handler(info)
}
