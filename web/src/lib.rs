#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use wasm_bindgen::prelude::*;

use ls8_emulator::runtime::disassemble;
use ls8_emulator::{parse_program, Computer, MachineConfig, RunState};

#[wasm_bindgen(start)]
fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    format!("{e}").into()
}

#[wasm_bindgen]
pub struct Emulator {
    computer: Computer,
    output: Vec<u8>,
}

#[wasm_bindgen]
impl Emulator {
    /// Load a program from its text object format
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str) -> Result<Emulator, JsValue> {
        let program = parse_program(source).map_err(to_js)?;
        let computer =
            Computer::with_program(MachineConfig::default(), &program).map_err(to_js)?;
        Ok(Self {
            computer,
            output: Vec::new(),
        })
    }

    /// Execute one instruction, returns whether the computer is still running
    pub fn step(&mut self) -> Result<bool, JsValue> {
        let state = self.computer.step(&mut self.output).map_err(to_js)?;
        Ok(state == RunState::Running)
    }

    /// Run until the computer stops, returns why it stopped
    pub fn run(&mut self) -> Result<String, JsValue> {
        let reason = self.computer.run(&mut self.output).map_err(to_js)?;
        Ok(reason.to_string())
    }

    /// Everything printed by the program so far
    #[must_use]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    #[must_use]
    pub fn registers(&self) -> Vec<u8> {
        self.computer.registers.as_array().to_vec()
    }

    #[must_use]
    pub fn memory(&self) -> Vec<u8> {
        self.computer.memory.as_slice().to_vec()
    }

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.computer.pc
    }

    #[must_use]
    pub fn flags(&self) -> u8 {
        self.computer.registers.flags.bits()
    }

    #[must_use]
    pub fn halted(&self) -> bool {
        !self.computer.state().is_running()
    }

    #[must_use]
    pub fn trace(&self) -> String {
        self.computer.trace().to_string()
    }
}

/// Disassemble a program, one instruction per line
#[wasm_bindgen]
pub fn dump(source: &str) -> Result<String, JsValue> {
    let program = parse_program(source).map_err(to_js)?;
    let listing = disassemble(&program)
        .into_iter()
        .map(|(offset, entry)| format!("{offset:02X}: {entry}"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(listing)
}
