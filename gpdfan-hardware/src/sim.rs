//! Simulated embedded controller
//!
//! Implements [`PortIo`] by decoding the EC's two-port handshake into a 64 KiB
//! register file, the same way the firmware latches it. Used by the test suite
//! and by the daemon's mock mode.
//!
//! Clones share state, so a test can hand one clone to the channel and keep
//! another to seed registers and inspect traffic. The traffic log grows with
//! every transaction; long-running users switch it off with
//! [`SimulatedEc::without_log`].

use gpdfan_core::{BoardDescriptor, BoardKind, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use crate::port_io::PortIo;

/// A single port operation, as seen on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOp {
    Out { port: u16, value: u8 },
    In { port: u16, value: u8 },
}

/// Fan speed reported by a freshly seeded board
pub const SIMULATED_RPM: u16 = 3000;

struct SimState {
    addr_port: u16,
    data_port: u16,
    registers: Vec<u8>,
    /// Last byte written to the address port
    selector: u8,
    /// Sub-register chosen through the index register
    sub_register: u8,
    address: [u8; 2],
    recording: bool,
    transcript: Vec<PortOp>,
    writes: Vec<(u16, u8)>,
    reads: Vec<u16>,
    read_faults: HashMap<u16, u32>,
    write_faults: HashMap<u16, u32>,
}

impl SimState {
    fn offset(&self) -> u16 {
        u16::from_be_bytes(self.address)
    }

    fn take_fault(faults: &mut HashMap<u16, u32>, offset: u16) -> bool {
        match faults.get_mut(&offset) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

/// In-memory EC reachable through a fake address/data port pair
#[derive(Clone)]
pub struct SimulatedEc {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedEc {
    /// Blank EC listening on the given ports
    pub fn new(addr_port: u16, data_port: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                addr_port,
                data_port,
                registers: vec![0; 0x10000],
                selector: 0,
                sub_register: 0,
                address: [0, 0],
                recording: true,
                transcript: Vec::new(),
                writes: Vec::new(),
                reads: Vec::new(),
                read_faults: HashMap::new(),
                write_faults: HashMap::new(),
            })),
        }
    }

    /// EC seeded with a spinning fan and the board's steady-state counters
    pub fn for_board(board: &BoardDescriptor) -> Self {
        let sim = Self::new(board.addr_port, board.data_port);
        sim.set_word(board.rpm_read, SIMULATED_RPM);

        match board.kind {
            BoardKind::Win4 => sim.set_register(0x1841, 0x7F),
            BoardKind::WinMax2 => {
                for offset in 0x1841..=0x1843 {
                    sim.set_register(offset, 0xB8);
                }
            }
            BoardKind::WinMini | BoardKind::Duo => {}
        }

        sim
    }

    /// Stop logging port traffic; register state and fault injection are
    /// unaffected. Mock mode runs with this so memory stays flat.
    pub fn without_log(self) -> Self {
        {
            let mut state = self.state.lock();
            state.recording = false;
            state.transcript = Vec::new();
            state.writes = Vec::new();
            state.reads = Vec::new();
        }
        self
    }

    pub fn register(&self, offset: u16) -> u8 {
        self.state.lock().registers[offset as usize]
    }

    pub fn set_register(&self, offset: u16, value: u8) {
        self.state.lock().registers[offset as usize] = value;
    }

    /// Store a big-endian word at `offset` and `offset + 1`
    pub fn set_word(&self, offset: u16, value: u16) {
        let [high, low] = value.to_be_bytes();
        let mut state = self.state.lock();
        state.registers[offset as usize] = high;
        state.registers[offset.wrapping_add(1) as usize] = low;
    }

    /// Every port operation since the last [`SimulatedEc::clear_log`]
    pub fn transcript(&self) -> Vec<PortOp> {
        self.state.lock().transcript.clone()
    }

    /// Completed register writes, in order
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.state.lock().writes.clone()
    }

    /// Values written to one register, in order
    pub fn writes_to(&self, offset: u16) -> Vec<u8> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Completed register reads, in order
    pub fn reads(&self) -> Vec<u16> {
        self.state.lock().reads.clone()
    }

    /// Number of completed register transactions (reads plus writes)
    pub fn transaction_count(&self) -> usize {
        let state = self.state.lock();
        state.reads.len() + state.writes.len()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.transcript.clear();
        state.writes.clear();
        state.reads.clear();
    }

    /// Fail the next `times` reads of `offset` with an I/O error
    pub fn fail_reads(&self, offset: u16, times: u32) {
        self.state.lock().read_faults.insert(offset, times);
    }

    /// Fail the next `times` writes to `offset` with an I/O error
    pub fn fail_writes(&self, offset: u16, times: u32) {
        self.state.lock().write_faults.insert(offset, times);
    }
}

impl PortIo for SimulatedEc {
    fn outb(&mut self, port: u16, value: u8) -> Result<()> {
        let mut state = self.state.lock();
        if state.recording {
            state.transcript.push(PortOp::Out { port, value });
        }

        if port == state.addr_port {
            state.selector = value;
            return Ok(());
        }
        if port != state.data_port {
            return Ok(());
        }

        match (state.selector, state.sub_register) {
            (0x2E, _) => state.sub_register = value,
            (0x2F, 0x11) => state.address[0] = value,
            (0x2F, 0x10) => state.address[1] = value,
            (0x2F, 0x12) => {
                let offset = state.offset();
                if SimState::take_fault(&mut state.write_faults, offset) {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("injected write fault at 0x{:04X}", offset),
                    )
                    .into());
                }
                state.registers[offset as usize] = value;
                if state.recording {
                    state.writes.push((offset, value));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn inb(&mut self, port: u16) -> Result<u8> {
        let mut state = self.state.lock();

        let value = if port == state.data_port && state.selector == 0x2F && state.sub_register == 0x12
        {
            let offset = state.offset();
            if SimState::take_fault(&mut state.read_faults, offset) {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("injected read fault at 0x{:04X}", offset),
                )
                .into());
            }
            if state.recording {
                state.reads.push(offset);
            }
            state.registers[offset as usize]
        } else {
            0xFF
        };

        if state.recording {
            state.transcript.push(PortOp::In { port, value });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpdfan_core::board::{WIN4_6800U, WIN_MAX_2, WIN_MINI};

    fn transfer(sim: &mut SimulatedEc, offset: u16) {
        let [high, low] = offset.to_be_bytes();
        for (sub, byte) in [(0x11, high), (0x10, low)] {
            sim.outb(0x4E, 0x2E).unwrap();
            sim.outb(0x4F, sub).unwrap();
            sim.outb(0x4E, 0x2F).unwrap();
            sim.outb(0x4F, byte).unwrap();
        }
        sim.outb(0x4E, 0x2E).unwrap();
        sim.outb(0x4F, 0x12).unwrap();
        sim.outb(0x4E, 0x2F).unwrap();
    }

    #[test]
    fn test_decodes_handshake() {
        let mut sim = SimulatedEc::for_board(&WIN_MINI);

        transfer(&mut sim, 0x047A);
        sim.outb(0x4F, 0x99).unwrap();
        assert_eq!(sim.register(0x047A), 0x99);
        assert_eq!(sim.writes(), vec![(0x047A, 0x99)]);

        transfer(&mut sim, 0x047A);
        assert_eq!(sim.inb(0x4F).unwrap(), 0x99);
        assert_eq!(sim.reads(), vec![0x047A]);
    }

    #[test]
    fn test_data_port_read_without_transfer_select() {
        let mut sim = SimulatedEc::new(0x4E, 0x4F);
        assert_eq!(sim.inb(0x4F).unwrap(), 0xFF);
        assert!(sim.reads().is_empty());
    }

    #[test]
    fn test_seeded_boards() {
        let win4 = SimulatedEc::for_board(&WIN4_6800U);
        assert_eq!(win4.register(0x1841), 0x7F);
        assert_eq!(win4.register(0xC880), 0x0B);
        assert_eq!(win4.register(0xC881), 0xB8);

        let wm2 = SimulatedEc::for_board(&WIN_MAX_2);
        assert_eq!(wm2.register(0x1843), 0xB8);
    }

    #[test]
    fn test_fault_injection_is_counted() {
        let mut sim = SimulatedEc::for_board(&WIN_MINI);
        sim.fail_reads(0x0478, 2);

        for _ in 0..2 {
            transfer(&mut sim, 0x0478);
            assert!(sim.inb(0x4F).is_err());
        }
        transfer(&mut sim, 0x0478);
        assert_eq!(sim.inb(0x4F).unwrap(), 0x0B);
    }

    #[test]
    fn test_unlogged_ec_keeps_logs_empty() {
        let mut sim = SimulatedEc::for_board(&WIN_MINI).without_log();

        for _ in 0..100 {
            transfer(&mut sim, 0x047A);
            sim.outb(0x4F, 0x20).unwrap();
            transfer(&mut sim, 0x0478);
            assert_eq!(sim.inb(0x4F).unwrap(), 0x0B);
        }

        assert_eq!(sim.register(0x047A), 0x20);
        assert!(sim.transcript().is_empty());
        assert!(sim.writes().is_empty());
        assert!(sim.reads().is_empty());
        assert_eq!(sim.transaction_count(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let sim = SimulatedEc::new(0x4E, 0x4F);
        let other = sim.clone();
        other.set_register(0x10, 7);
        assert_eq!(sim.register(0x10), 7);
    }
}
