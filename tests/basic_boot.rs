//! Simple boot test for the kernel.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(myos_rust::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use myos_rust::println;

/// Entry point for the test.
#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    // SAFETY: this is the first and only thing the test binary does before
    // running test cases.
    unsafe { myos_rust::kernel_init() };
    test_main();

    #[expect(
        clippy::empty_loop,
        reason = "Infinite loop after the test main function is done."
    )]
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    myos_rust::test_panic_handler(info)
}

/// Test that we can print a line.
#[test_case]
fn test_println() {
    println!("test_println output");
}

/// Boot registers slot 0 as the running kernel thread (spec.md §4.7); a
/// fresh boot should count exactly one active process before anything
/// else is spawned.
#[test_case]
fn test_kernel_thread_is_registered_after_boot() {
    assert_eq!(myos_rust::process::count_active(), 1);
}
