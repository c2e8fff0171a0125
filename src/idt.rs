//! Interrupt Descriptor Table: 256 raw gate descriptors plus the common
//! assembly trampoline that funnels every vector into [`dispatch`].
//!
//! Replaces the teacher's `x86_64::structures::idt::InterruptDescriptorTable`
//! (a long-mode layout) with a hand-rolled 32-bit interrupt-gate table, in
//! the spirit of the retrieved `xv6-rust` `gdt.rs`/`idt.rs` pair: one
//! `global_asm!` stub per vector pushing an error code placeholder and the
//! vector number, then jumping to a single Rust dispatcher.

use core::arch::{asm, global_asm};
use core::mem::size_of;

use crate::arch::regs;
use crate::gdt::KERNEL_CODE_SELECTOR;
use crate::{exceptions, pic, pit, syscall};
use crate::drivers::{keyboard, mouse};

const GATE_PRESENT: u8 = 1 << 7;
const GATE_32BIT_INTERRUPT: u8 = 0x0E;
const GATE_DPL0: u8 = 0 << 5;
const GATE_DPL3: u8 = 3 << 5;

const IRQ0_VECTOR: u8 = pic::PIC1_OFFSET;
const IRQ1_VECTOR: u8 = pic::PIC1_OFFSET + 1;
const IRQ12_VECTOR: u8 = pic::PIC1_OFFSET + 12;
const SYSCALL_VECTOR: u8 = 0x80;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl GateDescriptor {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    const fn new(handler: u32, dpl: u8) -> Self {
        Self {
            offset_low: (handler & 0xffff) as u16,
            selector: KERNEL_CODE_SELECTOR,
            zero: 0,
            type_attr: GATE_PRESENT | dpl | GATE_32BIT_INTERRUPT,
            offset_high: ((handler >> 16) & 0xffff) as u16,
        }
    }
}

static mut IDT: [GateDescriptor; 256] = [GateDescriptor::missing(); 256];

/// Register state saved by the common stub, in push order (last pushed is
/// first field, matching how `pusha` lands in memory and how the CPU's own
/// interrupt push order reads top-down). Exposed so [`exceptions`] and
/// [`syscall`] can inspect/mutate the interrupted context.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub user_esp: u32,
    pub user_ss: u32,
}

macro_rules! isr_stub {
    ($name:ident, $vector:literal, has_error_code: $has_err:literal) => {
        core::arch::global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            stringify!($name), ":\n",
            if $has_err { "" } else { "push 0\n" },
            "push ", stringify!($vector), "\n",
            "jmp isr_common_stub\n",
        ));
    };
}

extern "C" {
    fn isr_common_stub();
}

global_asm!(
    r#"
.global isr_common_stub
isr_common_stub:
    pusha
    push ds
    push es
    push fs
    push gs
    mov ax, 0x10
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax

    push esp
    call interrupt_dispatch
    add esp, 4

    pop gs
    pop fs
    pop es
    pop ds
    popa
    add esp, 8
    iretd
"#
);

// Exception vectors 0-19 that push no CPU error code get one synthesized
// as 0 so `InterruptFrame` has a uniform layout. 8, 10-14, 17 do push one.
isr_stub!(isr0, 0, has_error_code: false);
isr_stub!(isr1, 1, has_error_code: false);
isr_stub!(isr2, 2, has_error_code: false);
isr_stub!(isr3, 3, has_error_code: false);
isr_stub!(isr4, 4, has_error_code: false);
isr_stub!(isr5, 5, has_error_code: false);
isr_stub!(isr6, 6, has_error_code: false);
isr_stub!(isr7, 7, has_error_code: false);
isr_stub!(isr8, 8, has_error_code: true);
isr_stub!(isr9, 9, has_error_code: false);
isr_stub!(isr10, 10, has_error_code: true);
isr_stub!(isr11, 11, has_error_code: true);
isr_stub!(isr12, 12, has_error_code: true);
isr_stub!(isr13, 13, has_error_code: true);
isr_stub!(isr14, 14, has_error_code: true);
isr_stub!(isr15, 15, has_error_code: false);
isr_stub!(isr16, 16, has_error_code: false);
isr_stub!(isr17, 17, has_error_code: true);
isr_stub!(isr18, 18, has_error_code: false);
isr_stub!(isr19, 19, has_error_code: false);

isr_stub!(irq0, 32, has_error_code: false);
isr_stub!(irq1, 33, has_error_code: false);
isr_stub!(irq12, 44, has_error_code: false);

isr_stub!(isr_syscall, 0x80, has_error_code: false);

extern "C" {
    fn isr0();
    fn isr1();
    fn isr2();
    fn isr3();
    fn isr4();
    fn isr5();
    fn isr6();
    fn isr7();
    fn isr8();
    fn isr9();
    fn isr10();
    fn isr11();
    fn isr12();
    fn isr13();
    fn isr14();
    fn isr15();
    fn isr16();
    fn isr17();
    fn isr18();
    fn isr19();
    fn irq0();
    fn irq1();
    fn irq12();
    fn isr_syscall();
}

/// Builds the 256-entry IDT and loads the IDTR.
///
/// # Safety
/// Must run once during boot, after [`crate::gdt::init`] and before `sti`.
pub unsafe fn init() {
    // SAFETY: single-threaded boot context.
    unsafe {
        macro_rules! set {
            ($vector:expr, $handler:expr, $dpl:expr) => {
                IDT[$vector] = GateDescriptor::new($handler as u32, $dpl);
            };
        }
        set!(0, isr0, GATE_DPL0);
        set!(1, isr1, GATE_DPL0);
        set!(2, isr2, GATE_DPL0);
        set!(3, isr3, GATE_DPL0);
        set!(4, isr4, GATE_DPL0);
        set!(5, isr5, GATE_DPL0);
        set!(6, isr6, GATE_DPL0);
        set!(7, isr7, GATE_DPL0);
        set!(8, isr8, GATE_DPL0);
        set!(9, isr9, GATE_DPL0);
        set!(10, isr10, GATE_DPL0);
        set!(11, isr11, GATE_DPL0);
        set!(12, isr12, GATE_DPL0);
        set!(13, isr13, GATE_DPL0);
        set!(14, isr14, GATE_DPL0);
        set!(15, isr15, GATE_DPL0);
        set!(16, isr16, GATE_DPL0);
        set!(17, isr17, GATE_DPL0);
        set!(18, isr18, GATE_DPL0);
        set!(19, isr19, GATE_DPL0);
        set!(IRQ0_VECTOR as usize, irq0, GATE_DPL0);
        set!(IRQ1_VECTOR as usize, irq1, GATE_DPL0);
        set!(IRQ12_VECTOR as usize, irq12, GATE_DPL0);
        // DPL3 so `int 0x80` is callable from ring 3 (spec.md §4.8).
        set!(SYSCALL_VECTOR as usize, isr_syscall, GATE_DPL3);

        let idt_base = core::ptr::addr_of!(IDT) as u32;
        let idt_limit = (size_of::<[GateDescriptor; 256]>() - 1) as u16;
        regs::lidt(idt_base, idt_limit);
    }
}

/// Single dispatch point every vector funnels through. Exceptions below 32
/// go to [`exceptions::handle`]; IRQs are acknowledged with an early EOI
/// (spec.md §4.2) before running their driver-specific work so a second
/// interrupt of the same line can be delivered while this one finishes;
/// `0x80` goes to [`syscall::handle`].
#[no_mangle]
extern "C" fn interrupt_dispatch(frame: *mut InterruptFrame) {
    // SAFETY: `frame` points at the stack built by `isr_common_stub`, valid
    // for the duration of this call.
    let frame = unsafe { &mut *frame };
    match frame.vector {
        0..=19 => exceptions::handle(frame),
        v if v == u32::from(IRQ0_VECTOR) => {
            // SAFETY: runs inside the IRQ0 handler.
            unsafe { pic::send_eoi(0) };
            pit::tick();
            crate::process::on_timer_tick();
        }
        v if v == u32::from(IRQ1_VECTOR) => {
            // SAFETY: runs inside the IRQ1 handler.
            unsafe { pic::send_eoi(1) };
            keyboard::on_irq();
        }
        v if v == u32::from(IRQ12_VECTOR) => {
            // SAFETY: runs inside the IRQ12 handler.
            unsafe { pic::send_eoi(12) };
            mouse::on_irq();
        }
        v if v == u32::from(SYSCALL_VECTOR) => syscall::handle(frame),
        _ => {}
    }
}

/// Triggers a breakpoint exception, used by the test suite.
pub fn int3() {
    // SAFETY: `int3` is always safe to execute; the IDT entry for vector 3
    // routes it back into this same dispatcher.
    unsafe {
        asm!("int3", options(nomem, nostack));
    }
}
