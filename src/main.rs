/*
 * Wyrm: a minimal supervisor-mode kernel booted by OpenSBI. `boot` lands
 * here with a stack and nothing else; `kernel_main` zeroes bss, installs
 * the trap vector, builds the idle process and two demonstration
 * processes, and yields into them.
 *
 * Author: Giuseppe Capasso <capassog97@gmail.com>
 */
#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

use core::panic::PanicInfo;

#[macro_use]
mod console;
mod boot;
mod firmware;
mod mm;
mod process;
mod trap;

unsafe extern "C" {
    static __bss: u8;
    static __bss_end: u8;
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    let location = info.location();
    let file = location.map(|l| l.file()).unwrap_or("<unknown>");
    let line = location.map(|l| l.line()).unwrap_or(0) as i32;
    console::kprintf(
        "PANIC: %s:%d: ",
        &[console::Arg::Str(file), console::Arg::Signed(line)],
    );
    kprintf!("kernel panicked\n");
    halt()
}

pub fn halt() -> ! {
    loop {
        riscv::asm::wfi();
    }
}

fn zero_bss() {
    unsafe {
        let start = &raw const __bss as usize;
        let end = &raw const __bss_end as usize;
        core::ptr::write_bytes(start as *mut u8, 0, end - start);
    }
}

/// Spins for a fixed, arbitrary number of iterations. Stands in for a
/// real timer: this core has none, and the point is only to give the
/// other process a turn before yielding again.
fn delay() {
    for i in 0..30_000_000u32 {
        core::hint::black_box(i);
    }
}

extern "C" fn process_a_entry() -> ! {
    kprintf!("starting process A\n");
    loop {
        console::kprintf("A", &[]);
        delay();
        process::yield_();
    }
}

extern "C" fn process_b_entry() -> ! {
    kprintf!("starting process B\n");
    loop {
        console::kprintf("B", &[]);
        delay();
        process::yield_();
    }
}

#[no_mangle]
extern "C" fn kernel_main() -> ! {
    zero_bss();
    trap::install();

    process::init_table();
    let idle = process::create_process(process::idle_loop as usize);
    process::set_idle(idle);
    process::set_current(idle);

    process::create_process(process_a_entry as usize);
    process::create_process(process_b_entry as usize);

    process::yield_();

    crate::PANIC!("switched back to kernel_main");
}
