/*
 * Trap entry and dispatch. `kernel_entry` is naked: it cannot touch a
 * general-purpose register before recovering a safe stack pointer via the
 * sscratch swap, and it cannot assume the interrupted `sp` points at usable
 * memory.
 *
 * Author: Giuseppe Capasso <capassog97@gmail.com>
 */
use riscv::register::{scause, sepc, sscratch, stval, stvec};

/// One slot per saved integer register (all of them except `x0`), in the
/// fixed order the assembly below uses. `sp` is last, recovered from
/// `sscratch` rather than spilled directly.
#[repr(C)]
pub struct TrapFrame {
    pub ra: usize,
    pub gp: usize,
    pub tp: usize,
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    pub t3: usize,
    pub t4: usize,
    pub t5: usize,
    pub t6: usize,
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
    pub a6: usize,
    pub a7: usize,
    pub s0: usize,
    pub s1: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
    pub sp: usize,
}

const FRAME_WORDS: usize = 31;

/// Programs `stvec` to point at `kernel_entry` in direct mode. `kernel_entry`
/// is 4-byte aligned (required: the low two bits of `stvec` are mode flags).
pub fn install() {
    unsafe {
        stvec::write(kernel_entry as usize, stvec::TrapMode::Direct);
    }
}

/// Trap vector. Swaps `sp` with `sscratch` to reach the running process's
/// kernel stack, spills all 31 integer registers, calls `handle_trap`, then
/// restores and `sret`s. Must not be called directly.
#[unsafe(naked)]
#[no_mangle]
#[repr(align(4))]
pub unsafe extern "C" fn kernel_entry() {
    core::arch::naked_asm!(
        ".align 2",
        "csrrw sp, sscratch, sp",

        "addi sp, sp, -4*31",
        "sw ra,   4*0(sp)",
        "sw gp,   4*1(sp)",
        "sw tp,   4*2(sp)",
        "sw t0,   4*3(sp)",
        "sw t1,   4*4(sp)",
        "sw t2,   4*5(sp)",
        "sw t3,   4*6(sp)",
        "sw t4,   4*7(sp)",
        "sw t5,   4*8(sp)",
        "sw t6,   4*9(sp)",
        "sw a0,   4*10(sp)",
        "sw a1,   4*11(sp)",
        "sw a2,   4*12(sp)",
        "sw a3,   4*13(sp)",
        "sw a4,   4*14(sp)",
        "sw a5,   4*15(sp)",
        "sw a6,   4*16(sp)",
        "sw a7,   4*17(sp)",
        "sw s0,   4*18(sp)",
        "sw s1,   4*19(sp)",
        "sw s2,   4*20(sp)",
        "sw s3,   4*21(sp)",
        "sw s4,   4*22(sp)",
        "sw s5,   4*23(sp)",
        "sw s6,   4*24(sp)",
        "sw s7,   4*25(sp)",
        "sw s8,   4*26(sp)",
        "sw s9,   4*27(sp)",
        "sw s10,  4*28(sp)",
        "sw s11,  4*29(sp)",

        // The interrupted sp was stashed in sscratch by the swap above.
        "csrr a0, sscratch",
        "sw a0,   4*30(sp)",

        // Re-arm sscratch with the top of this stack before dispatching,
        // so a trap arriving before we return still finds a safe sp.
        "addi a0, sp, 4*31",
        "csrw sscratch, a0",

        "mv a0, sp",
        "call {handle_trap}",

        "lw ra,   4*0(sp)",
        "lw gp,   4*1(sp)",
        "lw tp,   4*2(sp)",
        "lw t0,   4*3(sp)",
        "lw t1,   4*4(sp)",
        "lw t2,   4*5(sp)",
        "lw t3,   4*6(sp)",
        "lw t4,   4*7(sp)",
        "lw t5,   4*8(sp)",
        "lw t6,   4*9(sp)",
        "lw a0,   4*10(sp)",
        "lw a1,   4*11(sp)",
        "lw a2,   4*12(sp)",
        "lw a3,   4*13(sp)",
        "lw a4,   4*14(sp)",
        "lw a5,   4*15(sp)",
        "lw a6,   4*16(sp)",
        "lw a7,   4*17(sp)",
        "lw s0,   4*18(sp)",
        "lw s1,   4*19(sp)",
        "lw s2,   4*20(sp)",
        "lw s3,   4*21(sp)",
        "lw s4,   4*22(sp)",
        "lw s5,   4*23(sp)",
        "lw s6,   4*24(sp)",
        "lw s7,   4*25(sp)",
        "lw s8,   4*26(sp)",
        "lw s9,   4*27(sp)",
        "lw s10,  4*28(sp)",
        "lw s11,  4*29(sp)",
        "lw sp,   4*30(sp)",

        "sret",
        handle_trap = sym handle_trap,
    )
}

/// This minimal core does no classification: every trap is fatal. Decoding
/// `scause` into syscall/timer/page-fault handling is future work that can
/// be added here without touching the entry sequence above.
#[no_mangle]
extern "C" fn handle_trap(_frame: *mut TrapFrame) {
    let cause = scause::read().bits();
    let tval = stval::read();
    let epc = sepc::read();
    crate::PANIC!(
        "unexpected trap scause=%x, stval=%x, sepc=%x",
        cause as u32,
        tval as u32,
        epc as u32
    );
}

const _: () = assert!(core::mem::size_of::<TrapFrame>() == FRAME_WORDS * 4);
