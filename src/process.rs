/*
 * Process table and cooperative scheduler. A process's kernel stack is
 * owned inline in its record; switching to it is nothing more than a
 * callee-saved-register swap between two stacks (`switch_context`), and
 * resuming one for the first time falls straight into its entry function
 * because `ra` was planted there at creation.
 *
 * Author: Giuseppe Capasso <capassog97@gmail.com>
 */
use heapless::Vec;
use riscv::register::sscratch;
use spin::Mutex;

pub const PROCS_MAX: usize = 8;
const STACK_SIZE: usize = 8192;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Runnable,
}

#[derive(Clone, Copy)]
pub struct Process {
    pub pid: i32,
    pub state: ProcState,
    pub sp: usize,
    stack: [u8; STACK_SIZE],
}

impl Process {
    const fn unused() -> Self {
        Process {
            pid: -1,
            state: ProcState::Unused,
            sp: 0,
            stack: [0; STACK_SIZE],
        }
    }

    fn stack_top(&self) -> usize {
        self.stack.as_ptr() as usize + STACK_SIZE
    }
}

struct Scheduler {
    procs: Vec<Process, PROCS_MAX>,
    current: usize,
    idle: usize,
}

static SCHEDULER: Mutex<Scheduler> = Mutex::new(Scheduler {
    procs: Vec::new(),
    current: 0,
    idle: 0,
});

/// Must run once, before any `create_process` call.
pub fn init_table() {
    let mut sched = SCHEDULER.lock();
    for _ in 0..PROCS_MAX {
        let _ = sched.procs.push(Process::unused());
    }
}

/// Scans for the first `UNUSED` slot, plants the 13 callee-saved registers
/// `switch_context` expects (`s11..s0, ra`, with `ra = entry` and every
/// `s*` zeroed), and assigns `pid = slot_index + 1`. Returns the slot index.
pub fn create_process(entry: usize) -> usize {
    let mut sched = SCHEDULER.lock();
    let slot = sched
        .procs
        .iter()
        .position(|p| p.state == ProcState::Unused)
        .unwrap_or_else(|| crate::PANIC!("no free process slots"));

    let proc = &mut sched.procs[slot];
    let top = proc.stack_top();
    let frame = (top - 13 * 4) as *mut u32;
    unsafe {
        core::ptr::write(frame, entry as u32); // ra
        for i in 1..13 {
            core::ptr::write(frame.add(i), 0); // s0..s11
        }
    }
    proc.sp = frame as usize;
    proc.pid = (slot + 1) as i32;
    proc.state = ProcState::Runnable;
    slot
}

/// Forces the idle process's `pid` to 0 and records its slot, as spec'd:
/// idle is built the same way as any other process, then special-cased.
pub fn set_idle(slot: usize) {
    let mut sched = SCHEDULER.lock();
    sched.procs[slot].pid = 0;
    sched.idle = slot;
}

/// Marks `slot` as the process currently executing, without switching to
/// it. Used once at startup before the first `yield_`.
pub fn set_current(slot: usize) {
    SCHEDULER.lock().current = slot;
}

pub extern "C" fn idle_loop() -> ! {
    loop {
        riscv::asm::wfi();
    }
}

/// Round-robin: scans all `PROCS_MAX` slots via `idx = (current_pid + i) %
/// PROCS_MAX`. Since `pid == slot + 1` (see `create_process`), this full
/// cycle of residues visits every slot exactly once, one past the current
/// process first, wrapping back around to its own slot last. The first
/// `RUNNABLE` slot with `pid > 0` wins; if none is found, idle runs.
pub fn yield_() {
    let (prev_sp, next_sp) = {
        let mut sched = SCHEDULER.lock();
        let current_pid = sched.procs[sched.current].pid;

        let mut next = sched.idle;
        for i in 0..PROCS_MAX {
            let idx = (current_pid as usize + i) % PROCS_MAX;
            let candidate = &sched.procs[idx];
            if candidate.state == ProcState::Runnable && candidate.pid > 0 {
                next = idx;
                break;
            }
        }

        if next == sched.current {
            return;
        }

        unsafe {
            sscratch::write(sched.procs[next].stack_top());
        }

        let prev_sp = &mut sched.procs[sched.current].sp as *mut usize;
        let next_sp = &mut sched.procs[next].sp as *mut usize;
        sched.current = next;
        (prev_sp, next_sp)
    };

    unsafe {
        switch_context(prev_sp, next_sp);
    }
}

/// Saves `ra, s0..s11` onto the current stack, stores the post-save `sp`
/// into `*prev_sp`, loads `*next_sp` into `sp`, restores the 13
/// callee-saved registers from the new stack, and returns. Caller-saved
/// registers need no preservation here: the compiler already spilled any
/// live ones before this call, per the normal calling convention.
#[unsafe(naked)]
unsafe extern "C" fn switch_context(prev_sp: *mut usize, next_sp: *mut usize) {
    core::arch::naked_asm!(
        "addi sp, sp, -13*4",
        "sw ra,   4*0(sp)",
        "sw s0,   4*1(sp)",
        "sw s1,   4*2(sp)",
        "sw s2,   4*3(sp)",
        "sw s3,   4*4(sp)",
        "sw s4,   4*5(sp)",
        "sw s5,   4*6(sp)",
        "sw s6,   4*7(sp)",
        "sw s7,   4*8(sp)",
        "sw s8,   4*9(sp)",
        "sw s9,   4*10(sp)",
        "sw s10,  4*11(sp)",
        "sw s11,  4*12(sp)",

        "sw sp, 0(a0)",
        "lw sp, 0(a1)",

        "lw ra,   4*0(sp)",
        "lw s0,   4*1(sp)",
        "lw s1,   4*2(sp)",
        "lw s2,   4*3(sp)",
        "lw s3,   4*4(sp)",
        "lw s4,   4*5(sp)",
        "lw s5,   4*6(sp)",
        "lw s6,   4*7(sp)",
        "lw s7,   4*8(sp)",
        "lw s8,   4*9(sp)",
        "lw s9,   4*10(sp)",
        "lw s10,  4*11(sp)",
        "lw s11,  4*12(sp)",
        "addi sp, sp, 13*4",
        "ret",
    )
}
