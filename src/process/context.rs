//! Cooperative stack-swap primitive and the synthetic initial stacks that
//! make a freshly spawned process look, to `context_switch`, exactly like
//! one that got preempted mid-run (spec.md §4.7). Grounded on the same
//! `global_asm!` save/restore shape as the retrieved `tinyOS`
//! `context/mod.rs`, adapted to 32-bit `pusha`/`popa`.

use core::arch::global_asm;

use crate::gdt::{USER_CODE_SELECTOR, USER_DATA_SELECTOR};

extern "C" {
    /// Saves the callee-saved registers and `esp` into `*old_esp_slot`,
    /// then loads `esp` from `new_esp` and restores its callee-saved
    /// registers before returning — into whatever context `new_esp`
    /// belongs to, which may be a different process than the caller.
    fn context_switch_asm(old_esp_slot: *mut u32, new_esp: u32);
}

global_asm!(
    r#"
.global context_switch_asm
context_switch_asm:
    push ebp
    push ebx
    push esi
    push edi

    mov eax, [esp + 20]
    mov [eax], esp

    mov esp, [esp + 24]

    pop edi
    pop esi
    pop ebx
    pop ebp
    ret
"#
);

/// # Safety
/// `old_esp_slot` must point at the `kernel_esp` field of the process
/// table entry for the currently running process; `new_esp` must be a
/// stack pointer previously saved by this same function or built by
/// [`build_kernel_stack`]/[`build_user_stack`].
pub unsafe fn context_switch(old_esp_slot: *mut u32, new_esp: u32) {
    // SAFETY: forwarded to the caller's contract.
    unsafe { context_switch_asm(old_esp_slot, new_esp) };
}

/// Trampoline every freshly built kernel stack returns into: the context
/// switch that lands here ran with interrupts disabled (spec.md §4.7), so
/// this re-enables them before calling the process's real entry point,
/// then parks it forever if that entry point ever returns (it shouldn't;
/// kernel threads are `-> !`).
#[no_mangle]
extern "C" fn kernel_task_trampoline(entry: extern "C" fn() -> !) -> ! {
    crate::arch::regs::sti();
    entry();
}

/// Builds a stack for a new kernel-mode process such that the first
/// `context_switch` into it resumes at `kernel_task_trampoline(entry)`.
///
/// # Safety
/// `stack_top` must be the exclusive top of a live, otherwise-unused
/// stack region at least a few hundred bytes deep.
pub unsafe fn build_kernel_stack(stack_top: u32, entry: extern "C" fn() -> !) -> u32 {
    // SAFETY: caller guarantees `stack_top` is a valid, exclusive stack.
    unsafe {
        let mut sp = stack_top;

        sp -= 4;
        (sp as *mut u32).write(entry as usize as u32);
        sp -= 4;
        (sp as *mut u32).write(0); // fake return address for the trampoline
        (sp as *mut u32).write(kernel_task_trampoline as usize as u32);

        sp -= 4;
        (sp as *mut u32).write(0); // ebp
        sp -= 4;
        (sp as *mut u32).write(0); // ebx
        sp -= 4;
        (sp as *mut u32).write(0); // esi
        sp -= 4;
        (sp as *mut u32).write(0); // edi

        sp
    }
}

/// Builds a ring-0 stack for a new user process whose first `context_switch`
/// into it executes an `iretd` into ring 3 at `entry_point`, running on a
/// fresh ring-3 stack at `user_stack_top`.
///
/// # Safety
/// `kernel_stack_top`/`user_stack_top` must each be the exclusive top of a
/// live, otherwise-unused stack region.
pub unsafe fn build_user_stack(kernel_stack_top: u32, user_stack_top: u32, entry_point: u32) -> u32 {
    const EFLAGS_INTERRUPT_ENABLE: u32 = 1 << 9;

    // SAFETY: caller guarantees both stacks are valid and exclusive.
    unsafe {
        let mut sp = kernel_stack_top;

        // IRET frame: ss, esp, eflags, cs, eip (pushed high-to-low so eip
        // ends up lowest, matching what `iretd` pops in order).
        sp -= 4;
        (sp as *mut u32).write(u32::from(USER_DATA_SELECTOR));
        sp -= 4;
        (sp as *mut u32).write(user_stack_top);
        sp -= 4;
        (sp as *mut u32).write(EFLAGS_INTERRUPT_ENABLE);
        sp -= 4;
        (sp as *mut u32).write(u32::from(USER_CODE_SELECTOR));
        sp -= 4;
        (sp as *mut u32).write(entry_point);

        sp -= 4;
        (sp as *mut u32).write(0); // fake return address for the trampoline
        (sp as *mut u32).write(user_task_trampoline as usize as u32);

        sp -= 4;
        (sp as *mut u32).write(0); // ebp
        sp -= 4;
        (sp as *mut u32).write(0); // ebx
        sp -= 4;
        (sp as *mut u32).write(0); // esi
        sp -= 4;
        (sp as *mut u32).write(0); // edi

        sp
    }
}

/// Trampoline a freshly built user stack returns into: reloads the
/// ring-3 data segment selectors and `iretd`s into the IRET frame built
/// right below this point by [`build_user_stack`].
#[no_mangle]
unsafe extern "C" fn user_task_trampoline() -> ! {
    // SAFETY: this only ever runs immediately after `context_switch_asm`
    // restores a stack built by `build_user_stack`, so the IRET frame this
    // reads is exactly what was written there.
    unsafe {
        core::arch::asm!(
            "mov ax, {data:x}",
            "mov ds, ax",
            "mov es, ax",
            "mov fs, ax",
            "mov gs, ax",
            "iretd",
            data = in(reg) USER_DATA_SELECTOR as u32,
            options(noreturn),
        );
    }
}
