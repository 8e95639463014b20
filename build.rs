/*
 * Link the kernel against our own linker script instead of the host's default
 * one. There is no C shared library to bind against here (unlike the firmware
 * this project is patterned on): the kernel only needs section placement.
 * Author: Giuseppe Capasso <capassog97@gmail.com>
 */
fn main() {
    println!("cargo:rustc-link-arg=-Tlinker.ld");
    println!("cargo:rustc-link-arg=-nostartfiles");
    println!("cargo:rerun-if-changed=linker.ld");
}
