//! Tests for heap allocation in a `no_std` environment using a custom allocator.
#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(myos_rust::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_assert_message)]
extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::panic::PanicInfo;

use myos_rust::config::HEAP_SIZE;

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    // SAFETY: this is the first and only thing the test binary does before
    // running test cases; it brings up the heap along with everything else.
    unsafe { myos_rust::kernel_init() };

    test_main();
    #[expect(clippy::empty_loop)]
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    myos_rust::test_panic_handler(info)
}

#[test_case]
fn when_creating_simple_allocation_then_memory_is_allocated() {
    let heap_value_1 = Box::new(41);
    let heap_value_2 = Box::new(42);

    assert_eq!(*heap_value_1, 41);
    assert_eq!(*heap_value_2, 42);
}

#[test_case]
fn when_creating_large_vec_then_memory_is_allocated() {
    let mut vec = Vec::new();
    for i in 0..1000 {
        vec.push(i);
    }
    assert_eq!(vec.iter().sum::<u64>(), (0..1000).sum());
}

#[test_case]
fn when_many_boxes_are_allocated_then_memory_is_allocated() {
    for i in 0..HEAP_SIZE / 64 {
        let x = Box::new(i);
        assert_eq!(*x, i);
    }
}

#[test_case]
fn when_box_is_dropped_then_space_is_reclaimed() {
    let used_before = myos_rust::memory::heap::used_bytes();
    {
        let _x = Box::new([0u8; 4096]);
    }
    let used_after = myos_rust::memory::heap::used_bytes();
    assert_eq!(used_before, used_after, "dropping a box should coalesce its block back in");
}
