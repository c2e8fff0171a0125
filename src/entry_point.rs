//! Main for little self made rust OS.

#![feature(custom_test_frameworks)]
#![test_runner(myos_rust::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![no_std]
#![no_main]

use core::panic::PanicInfo;

////////////////////////
//     Entry point    //
////////////////////////

/// This function is the entry point, since the linker looks for a function
/// named `_start` by default.
///
/// The bootloader hands off in 32-bit protected mode with paging disabled
/// and a throwaway stack; `kernel_init` brings up descriptor tables,
/// memory management, the timer and input drivers before `kernel_run`
/// starts either the desktop or the text shell.
#[no_mangle]
#[link_section = ".text.start"]
pub extern "C" fn _start() -> ! {
    // SAFETY: this is the very first thing `_start` does.
    unsafe {
        myos_rust::kernel_init();
    }

    #[cfg(test)]
    test_main();

    myos_rust::kernel_run();
}

////////////////////////
//    Panic handler   //
////////////////////////

/// This function is called on panic.
#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    myos_rust::println!("KERNEL PANIC: {}", info);
    loop {
        myos_rust::arch::regs::hlt();
    }
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    myos_rust::test_panic_handler(info)
}

/// Custom test try.
/// # Panics
/// May panic if the test fail
#[expect(clippy::assertions_on_constants)]
#[test_case]
fn trivial_assertion() {
    assert!(true, "Make this test pass.");
}
