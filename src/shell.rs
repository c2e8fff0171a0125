//! VGA text-mode CLI fallback (spec.md §6), used when no bootinfo
//! framebuffer is available. Reads characters from
//! [`crate::drivers::keyboard::pop_char`], echoes them to the VGA text
//! writer, and dispatches completed lines to a small built-in command set.

use alloc::string::String;

use crate::{println, process};

const MAX_LINE: usize = 120;

/// Runs the shell's read-eval-print loop. Does not return.
pub fn run() -> ! {
    println!("myos_rust shell. Type 'help' for commands.");
    let mut line = String::new();

    loop {
        if let Some(byte) = crate::drivers::keyboard::pop_char() {
            match byte {
                b'\n' => {
                    println!();
                    dispatch(&line);
                    line.clear();
                    print_prompt();
                }
                8 => {
                    if line.pop().is_some() {
                        crate::print!("\u{8} \u{8}");
                    }
                }
                ch if line.len() < MAX_LINE => {
                    line.push(ch as char);
                    crate::print!("{}", ch as char);
                }
                _ => {}
            }
        } else {
            crate::arch::regs::hlt();
        }
    }
}

fn print_prompt() {
    crate::print!("> ");
}

fn dispatch(line: &str) {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return;
    };
    let rest: alloc::vec::Vec<&str> = parts.collect();

    match command {
        "help" => println!(
            "commands: help clear reboot meminfo echo <text> ls cat <file> tasks demo uname"
        ),
        "clear" => {
            for _ in 0..25 {
                println!();
            }
        }
        "reboot" => reboot(),
        "meminfo" => println!("heap used: {} B", crate::memory::heap::used_bytes()),
        "echo" => println!("{}", rest.join(" ")),
        "ls" => list_files(),
        "cat" => cat_file(rest.first().copied()),
        "tasks" => list_tasks(),
        "demo" => run_demo(),
        "uname" => println!("myos_rust 0.1.0 i686"),
        _ => println!("unknown command: {command}"),
    }
}

fn list_tasks() {
    println!("uptime ticks: {}", process::uptime_ticks());
    for task in process::list() {
        let ring = if task.is_user { "ring3" } else { "ring0" };
        println!("  [{}] {} {:?} ({ring})", task.id, task.name, task.state);
    }
}

fn run_demo() {
    match process::spawn_user("demo", crate::userdemo::entry as u32) {
        Ok(slot) => println!("spawned demo user process in slot {slot}"),
        Err(err) => println!("demo: {}", err.as_str()),
    }
}

fn list_files() {
    match crate::drivers::ata::probe() {
        Some(drive) => match crate::fs::fat16::Fat16::mount(drive) {
            Ok(fs) => match fs.read_root_dir() {
                Ok(entries) => {
                    for entry in entries {
                        println!("{}", entry.display_name());
                    }
                }
                Err(err) => println!("ls: {}", err.as_str()),
            },
            Err(err) => println!("ls: {}", err.as_str()),
        },
        None => println!("ls: no disk found"),
    }
}

fn cat_file(name: Option<&str>) {
    let Some(name) = name else {
        println!("usage: cat <file>");
        return;
    };
    let Some(drive) = crate::drivers::ata::probe() else {
        println!("cat: no disk found");
        return;
    };
    let fs = match crate::fs::fat16::Fat16::mount(drive) {
        Ok(fs) => fs,
        Err(err) => {
            println!("cat: {}", err.as_str());
            return;
        }
    };
    let entry = match fs.find(name) {
        Ok(entry) => entry,
        Err(err) => {
            println!("cat: {}: {}", name, err.as_str());
            return;
        }
    };
    let mut buf = alloc::vec![0u8; entry.size as usize];
    match fs.read_file(&entry, &mut buf) {
        Ok(n) => match core::str::from_utf8(&buf[..n]) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("cat: {name}: not valid UTF-8"),
        },
        Err(err) => println!("cat: {}", err.as_str()),
    }
}

fn reboot() -> ! {
    // SAFETY: the keyboard controller's pulse-reset-line command (0xFE to
    // the PS/2 command port) is the conventional x86 software reset path.
    unsafe {
        crate::arch::io::outb(0x64, 0xFE);
    }
    loop {
        crate::arch::regs::hlt();
    }
}
