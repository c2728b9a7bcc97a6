//! Value Change Dump output.
//!
//! [`VcdTracer`] is a [`TickListener`] that writes IEEE 1364 VCD text for a
//! set of traced buses. The header and initial values are written on the
//! first tick; afterwards a `#time` record is written for every instant in
//! which at least one traced bus changed.

use std::io::Write;

use wirestep_config::TimeUnit;

use crate::bus::Bus;
use crate::circuit::Circuit;
use crate::error::SimError;
use crate::module::TickListener;

struct TracedBus {
    name: String,
    bus: Bus,
    code: String,
    last: Option<String>,
}

/// VCD writer over any [`Write`] sink.
///
/// Add buses with [`trace`](VcdTracer::trace) before registering the tracer
/// with the kernel.
pub struct VcdTracer<W: Write> {
    writer: W,
    time_unit: TimeUnit,
    scope: String,
    traces: Vec<TracedBus>,
    header_written: bool,
}

impl<W: Write> VcdTracer<W> {
    /// Creates a tracer with one time step equal to one `time_unit`.
    pub fn new(writer: W, time_unit: TimeUnit) -> Self {
        Self {
            writer,
            time_unit,
            scope: "top".to_string(),
            traces: Vec::new(),
            header_written: false,
        }
    }

    /// Sets the scope name wrapping every variable (default `top`).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Adds a bus to the trace under `name`.
    pub fn trace(mut self, name: impl Into<String>, bus: Bus) -> Self {
        let code = make_id_code(self.traces.len() as u32);
        self.traces.push(TracedBus {
            name: name.into(),
            bus,
            code,
            last: None,
        });
        self
    }

    /// Returns the number of traced buses.
    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Consumes the tracer and returns the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$date")?;
        writeln!(self.writer, "  wirestep simulation")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  wirestep {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1{}", self.time_unit.suffix())?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$scope module {} $end", self.scope)?;
        for t in &self.traces {
            let width = t.bus.width();
            if width == 1 {
                writeln!(self.writer, "$var wire 1 {} {} $end", t.code, t.name)?;
            } else {
                writeln!(
                    self.writer,
                    "$var wire {width} {} {} [{}:0] $end",
                    t.code,
                    t.name,
                    width.saturating_sub(1)
                )?;
            }
        }
        writeln!(self.writer, "$upscope $end")?;
        writeln!(self.writer, "$enddefinitions $end")?;
        self.header_written = true;
        Ok(())
    }

    fn write_value(writer: &mut W, value: &str, code: &str) -> Result<(), SimError> {
        if value.len() == 1 {
            writeln!(writer, "{value}{code}")?;
        } else {
            writeln!(writer, "b{value} {code}")?;
        }
        Ok(())
    }
}

/// Generates a VCD identifier code from a sequential index.
///
/// Uses printable ASCII starting from `!` (0x21); indices >= 94 produce
/// multi-character codes.
fn make_id_code(index: u32) -> String {
    let mut result = String::new();
    let mut idx = index;
    loop {
        let c = (b'!' + (idx % 94) as u8) as char;
        result.push(c);
        idx /= 94;
        if idx == 0 {
            break;
        }
        idx -= 1;
    }
    result
}

impl<W: Write> TickListener for VcdTracer<W> {
    fn on_tick(&mut self, circuit: &mut Circuit) -> Result<(), SimError> {
        let time = circuit.time();
        if !self.header_written {
            self.write_header()?;
            writeln!(self.writer, "#{time}")?;
            writeln!(self.writer, "$dumpvars")?;
            for t in &mut self.traces {
                let value = circuit.bus_string(&t.bus);
                Self::write_value(&mut self.writer, &value, &t.code)?;
                t.last = Some(value);
            }
            writeln!(self.writer, "$end")?;
            return Ok(());
        }

        let mut stamped = false;
        for t in &mut self.traces {
            let value = circuit.bus_string(&t.bus);
            if t.last.as_deref() == Some(value.as_str()) {
                continue;
            }
            if !stamped {
                writeln!(self.writer, "#{time}")?;
                stamped = true;
            }
            Self::write_value(&mut self.writer, &value, &t.code)?;
            t.last = Some(value);
        }
        Ok(())
    }

    fn finish(&mut self, _circuit: &Circuit) -> Result<(), SimError> {
        if !self.header_written {
            self.write_header()?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirestep_common::LogicValue;

    fn output(tracer: VcdTracer<Vec<u8>>) -> String {
        String::from_utf8(tracer.into_inner()).unwrap()
    }

    fn settle(c: &mut Circuit) {
        while c.scheduler().has_delta_work() {
            c.run_delta_round();
        }
    }

    #[test]
    fn id_codes() {
        assert_eq!(make_id_code(0), "!");
        assert_eq!(make_id_code(1), "\"");
        assert_eq!(make_id_code(93), "~");
        assert_eq!(make_id_code(94).len(), 2);
    }

    #[test]
    fn header_declares_vars_and_timescale() {
        let mut c = Circuit::new();
        let clk = c.add_signal_with("clk", LogicValue::Low);
        let data = c.add_bus("data", 4);
        let mut tracer = VcdTracer::new(Vec::new(), TimeUnit::Ns)
            .trace("clk", clk.into())
            .trace("data", data);
        tracer.on_tick(&mut c).unwrap();
        tracer.finish(&c).unwrap();

        let out = output(tracer);
        assert!(out.contains("$timescale\n  1ns\n$end"));
        assert!(out.contains("$scope module top $end"));
        assert!(out.contains("$var wire 1 ! clk $end"));
        assert!(out.contains("$var wire 4 \" data [3:0] $end"));
        assert!(out.contains("$enddefinitions $end"));
        assert!(out.contains("#0\n$dumpvars\n0!\nbxxxx \"\n$end"));
    }

    #[test]
    fn records_only_instants_with_changes() {
        let mut c = Circuit::new();
        let a = c.add_signal_with("a", LogicValue::Low);
        let mut tracer = VcdTracer::new(Vec::new(), TimeUnit::Us).trace("a", a.into());
        tracer.on_tick(&mut c).unwrap();

        c.scheduler_mut().advance_time();
        tracer.on_tick(&mut c).unwrap();

        c.scheduler_mut().advance_time();
        c.write(a, LogicValue::HighZ);
        settle(&mut c);
        tracer.on_tick(&mut c).unwrap();
        tracer.finish(&c).unwrap();

        let out = output(tracer);
        assert!(!out.contains("#1\n"));
        assert!(out.ends_with("#2\nz!\n"));
    }

    #[test]
    fn finish_without_ticks_writes_header() {
        let c = Circuit::new();
        let mut tracer = VcdTracer::new(Vec::new(), TimeUnit::Ps).with_scope("dut");
        tracer.finish(&c).unwrap();
        let out = output(tracer);
        assert!(out.contains("$scope module dut $end"));
        assert!(out.contains("1ps"));
        assert!(out.contains("$enddefinitions $end"));
    }
}
