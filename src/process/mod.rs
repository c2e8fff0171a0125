//! Process table and round-robin scheduler (spec.md §4.7).
//!
//! Supersedes the teacher's `task/mod.rs` cooperative `Task`/`Executor`
//! future-polling model: this kernel preempts via the PIT timer interrupt
//! instead of `Waker`-driven polling, so process state lives in a fixed
//! table of descriptors rather than a queue of boxed futures.

pub mod context;

use spin::Mutex;

use crate::config::{KERNEL_STACK_SIZE, MAX_PROCESSES, USER_KERNEL_STACK_SIZE, USER_STACK_SIZE};
use crate::error::{KernelError, KernelResult};
use crate::idt::InterruptFrame;
use crate::{gdt, pit};

/// Lifecycle state of a process table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Slot is unused and available for [`spawn_kernel`]/[`spawn_user`].
    Unused,
    /// Runnable, waiting for its turn on the CPU.
    Ready,
    /// Currently executing.
    Running,
    /// Finished; slot will be reclaimed on the next schedule pass.
    Terminated,
}

/// One process table entry.
pub struct Process {
    pub id: usize,
    pub name: &'static str,
    pub state: ProcessState,
    pub is_user: bool,
    /// Saved stack pointer for kernel-mode processes; the context-switch
    /// glue reads/writes this directly.
    pub kernel_esp: u32,
    /// Top of this process's ring-0 stack, loaded into the TSS before
    /// dispatch so interrupts taken in ring 3 land on the right stack.
    pub kernel_stack_top: u32,
}

impl Process {
    const fn unused() -> Self {
        Self {
            id: 0,
            name: "",
            state: ProcessState::Unused,
            is_user: false,
            kernel_esp: 0,
            kernel_stack_top: 0,
        }
    }
}

/// A snapshot of one table slot, for the shell's `tasks` command and the
/// window manager's "System Info" panel.
#[derive(Debug, Clone, Copy)]
pub struct ProcessInfo {
    pub id: usize,
    pub name: &'static str,
    pub state: ProcessState,
    pub is_user: bool,
}

struct Table {
    processes: [Process; MAX_PROCESSES],
    current: usize,
    ticks_since_switch: u32,
}

/// Ticks a process runs before the scheduler considers switching away,
/// giving each quantum more than a single 10ms PIT period.
const QUANTUM_TICKS: u32 = 5;

static TABLE: Mutex<Table> = Mutex::new(Table {
    processes: [const { Process::unused() }; MAX_PROCESSES],
    current: 0,
    ticks_since_switch: 0,
});

static mut KERNEL_STACKS: [[u8; KERNEL_STACK_SIZE]; MAX_PROCESSES] =
    [[0; KERNEL_STACK_SIZE]; MAX_PROCESSES];
static mut USER_STACKS: [[u8; USER_STACK_SIZE]; MAX_PROCESSES] =
    [[0; USER_STACK_SIZE]; MAX_PROCESSES];
static mut USER_KERNEL_STACKS: [[u8; USER_KERNEL_STACK_SIZE]; MAX_PROCESSES] =
    [[0; USER_KERNEL_STACK_SIZE]; MAX_PROCESSES];

/// Spawns a ring-0 kernel thread running `entry`, which must never return.
/// `name` is kept for diagnostics (`tasks`, "System Info") only.
pub fn spawn_kernel(name: &'static str, entry: extern "C" fn() -> !) -> KernelResult<usize> {
    let mut table = TABLE.lock();
    let slot = table
        .processes
        .iter()
        .position(|p| p.state == ProcessState::Unused)
        .ok_or(KernelError::NoFreeProcessSlot)?;

    // SAFETY: slot `slot` in `KERNEL_STACKS` is not referenced by any other
    // live process (guaranteed by the table lock and `Unused` check above).
    let stack_top = unsafe {
        core::ptr::addr_of!(KERNEL_STACKS[slot]) as u32 + KERNEL_STACK_SIZE as u32
    };
    // SAFETY: `stack_top` is the freshly reserved top of this slot's stack.
    let esp = unsafe { context::build_kernel_stack(stack_top, entry) };

    table.processes[slot] = Process {
        id: slot,
        name,
        state: ProcessState::Ready,
        is_user: false,
        kernel_esp: esp,
        kernel_stack_top: stack_top,
    };
    Ok(slot)
}

/// Spawns a ring-3 user process whose code starts at `entry_point` (an
/// address in the identity-mapped region containing the loaded binary).
pub fn spawn_user(name: &'static str, entry_point: u32) -> KernelResult<usize> {
    let mut table = TABLE.lock();
    let slot = table
        .processes
        .iter()
        .position(|p| p.state == ProcessState::Unused)
        .ok_or(KernelError::NoFreeProcessSlot)?;

    // SAFETY: slots reserved exclusively for this process by the table lock.
    let (user_stack_top, kernel_stack_top) = unsafe {
        (
            core::ptr::addr_of!(USER_STACKS[slot]) as u32 + USER_STACK_SIZE as u32,
            core::ptr::addr_of!(USER_KERNEL_STACKS[slot]) as u32 + USER_KERNEL_STACK_SIZE as u32,
        )
    };
    // SAFETY: both stacks are freshly reserved and unused.
    let esp = unsafe {
        context::build_user_stack(kernel_stack_top, user_stack_top, entry_point)
    };

    table.processes[slot] = Process {
        id: slot,
        name,
        state: ProcessState::Ready,
        is_user: true,
        kernel_esp: esp,
        kernel_stack_top,
    };
    Ok(slot)
}

/// Called from the timer IRQ handler on every PIT tick. Counts down the
/// current process's quantum and switches when it expires.
pub fn on_timer_tick() {
    let mut table = TABLE.lock();
    table.ticks_since_switch += 1;
    if table.ticks_since_switch < QUANTUM_TICKS {
        return;
    }
    table.ticks_since_switch = 0;
    drop(table);
    schedule();
}

/// Picks the next `Ready`/`Running` process after the current one, round
/// robin, and context-switches into it. A no-op if no other process is
/// runnable.
pub fn schedule() {
    let mut table = TABLE.lock();
    let count = table.processes.len();
    let start = table.current;

    for offset in 1..=count {
        let candidate = (start + offset) % count;
        if table.processes[candidate].state == ProcessState::Ready {
            let old = table.current;
            if table.processes[old].state == ProcessState::Running {
                table.processes[old].state = ProcessState::Ready;
            }
            table.processes[candidate].state = ProcessState::Running;
            table.current = candidate;

            let kernel_stack_top = table.processes[candidate].kernel_stack_top;
            // SAFETY: `gdt::set_kernel_stack`'s contract requires `esp0` to
            // be a valid, currently unused ring-0 stack top for the process
            // about to run, which `kernel_stack_top` is by construction.
            unsafe { gdt::set_kernel_stack(kernel_stack_top) };

            let old_esp_slot = core::ptr::addr_of_mut!(table.processes[old].kernel_esp);
            let new_esp = table.processes[candidate].kernel_esp;
            drop(table);
            // SAFETY: `old_esp_slot` points at a live `Process::kernel_esp`
            // field; `new_esp` was saved by a prior context switch or built
            // by `context::build_kernel_stack`/`build_user_stack`.
            unsafe { context::context_switch(old_esp_slot, new_esp) };
            return;
        }
    }
}

/// Marks the currently running process terminated and switches away from
/// it without returning to it. Used by [`crate::exceptions::handle`] and
/// the `exit` syscall.
///
/// Both of this process's stacks (ring-0 always, ring-3 for user
/// processes) live in fixed per-slot arrays rather than being heap
/// allocated, so "freeing" them is exactly marking the slot `Unused` so
/// [`spawn_kernel`]/[`spawn_user`] may reuse it (spec.md §3, §4.7).
pub fn terminate_current(_interrupted: &mut InterruptFrame) {
    let mut table = TABLE.lock();
    let current = table.current;
    table.processes[current] = Process::unused();
    drop(table);
    schedule();
    // `schedule` only returns here (rather than switching into a different
    // context) when no other process was `Ready`; resuming the exited
    // process via the interrupt epilogue would run freed code, so halt
    // instead (spec.md §4.7, §4.12).
    loop {
        crate::arch::regs::hlt();
    }
}

/// Registers the currently executing boot context (the code that called
/// [`crate::kernel_init`]) as slot 0's kernel thread, so the scheduler has
/// somewhere to switch back to. Must run once, before any timer tick can
/// invoke [`schedule`].
pub fn init() {
    let mut table = TABLE.lock();
    table.processes[0] = Process {
        id: 0,
        name: "kernel",
        state: ProcessState::Running,
        is_user: false,
        kernel_esp: 0,
        kernel_stack_top: 0,
    };
    table.current = 0;
}

/// Snapshots every non-`Unused` process slot, for the shell's `tasks`
/// command and the window manager's "System Info" panel.
pub fn list() -> alloc::vec::Vec<ProcessInfo> {
    TABLE
        .lock()
        .processes
        .iter()
        .filter(|p| p.state != ProcessState::Unused)
        .map(|p| ProcessInfo {
            id: p.id,
            name: p.name,
            state: p.state,
            is_user: p.is_user,
        })
        .collect()
}

/// Number of non-`Unused` process slots.
#[must_use]
pub fn count_active() -> usize {
    TABLE
        .lock()
        .processes
        .iter()
        .filter(|p| p.state != ProcessState::Unused)
        .count()
}

/// Ticks elapsed since boot, re-exported for the shell's `uname`/`meminfo`.
#[must_use]
pub fn uptime_ticks() -> u64 {
    pit::ticks()
}
