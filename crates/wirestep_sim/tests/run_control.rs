//! Driver-level tests: configuration, tick listeners, tracing and cancellation.

use std::fs;

use wirestep_config::load_config;
use wirestep_sim::LogicValue::*;
use wirestep_sim::{
    simulate, Bus, CancelToken, ChangeMonitor, ChangeRecord, Circuit, Module, PortId,
    SchedulerState, SignalEvent, SignalId, SimError, SimKernel, StepResult, TickListener, TimeUnit,
    VcdTracer,
};

/// Drives a counter value onto a bus every `period` instants.
struct Counter {
    bus: Bus,
    period: u64,
    count: u64,
}

impl TickListener for Counter {
    fn on_tick(&mut self, circuit: &mut Circuit) -> Result<(), SimError> {
        if circuit.time() % self.period == 0 {
            circuit.write_bus_u64(&self.bus, self.count);
            self.count += 1;
        }
        Ok(())
    }
}

/// Cancels the run once `line` reads High.
struct Watchdog {
    line: SignalId,
    token: CancelToken,
}

impl TickListener for Watchdog {
    fn on_tick(&mut self, circuit: &mut Circuit) -> Result<(), SimError> {
        if circuit.read(self.line) == High {
            self.token.cancel();
        }
        Ok(())
    }
}

#[test]
fn change_monitor_records_counter_values() {
    let mut k = SimKernel::new();
    let bus = k.circuit_mut().add_bus_with("count", 2, Low);
    k.register_tick_listener(Counter {
        bus: bus.clone(),
        period: 2,
        count: 0,
    });
    let monitor = ChangeMonitor::new("count", bus);
    let log = monitor.log();
    k.register_tick_listener(monitor);
    k.set_stop_time(6);
    k.start().unwrap();

    // Counter writes land at the next step's drain, before the monitor samples.
    let records = log.borrow();
    let expected: Vec<ChangeRecord> = [(0, "00"), (3, "01"), (5, "10")]
        .into_iter()
        .map(|(time, value)| ChangeRecord {
            time,
            value: value.to_string(),
        })
        .collect();
    assert_eq!(*records, expected);
}

#[test]
fn watchdog_cancels_run() {
    let mut k = SimKernel::new();
    let clk = k.add_clock("clk", 4).unwrap();
    let token = k.cancel_token();
    k.register_tick_listener(Watchdog { line: clk, token });
    k.set_stop_time(1_000);

    let summary = k.start().unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.final_time, 4);
    assert_eq!(k.state(), SchedulerState::Stopped);
}

#[test]
fn step_reports_done_at_stop_time() {
    let mut k = SimKernel::new();
    k.set_stop_time(2);
    assert_eq!(k.step().unwrap(), StepResult::Continued);
    assert_eq!(k.step().unwrap(), StepResult::Done);
    assert_eq!(k.time(), 2);
    assert_eq!(k.summary().instants, 2);
}

#[test]
fn vcd_trace_written_through_simulate() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("out.vcd");
    let toml = format!(
        r#"
[simulation]
stop_time = 6
time_unit = "ns"

[clock]
pulse_width = 2

[trace]
path = "{}"
"#,
        trace_path.display()
    );
    fs::write(dir.path().join("wirestep.toml"), toml).unwrap();

    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.simulation.time_unit, TimeUnit::Ns);

    let summary = simulate(&config, |kernel| {
        let clk = kernel.add_default_clock("clk")?;
        Ok(vec![("clk".to_string(), clk.into())])
    })
    .unwrap();
    assert_eq!(summary.final_time, 6);

    let vcd = fs::read_to_string(&trace_path).unwrap();
    assert!(vcd.contains("$timescale\n  1ns\n$end"));
    assert!(vcd.contains("$var wire 1 ! clk $end"));
    assert!(vcd.contains("#0\n$dumpvars\n0!\n$end"));
    assert!(vcd.contains("#2\n1!\n"));
    assert!(vcd.contains("#4\n0!\n"));
    assert!(vcd.contains("#6\n1!\n"));
    assert!(!vcd.contains("#1\n"));
}

#[test]
fn vcd_tracer_in_memory_bus() {
    let mut k = SimKernel::new();
    let bus = k.circuit_mut().add_bus_with("d", 3, Low);
    k.set_stop_time(2);
    k.circuit_mut().write_bus_u64(&bus, 5);
    let mut tracer = VcdTracer::new(Vec::new(), k.time_unit()).trace("d", bus);

    k.run_until(0).unwrap();
    tracer.on_tick(k.circuit_mut()).unwrap();
    tracer.finish(k.circuit()).unwrap();

    let out = String::from_utf8(tracer.into_inner()).unwrap();
    assert!(out.contains("1us"));
    assert!(out.contains("$var wire 3 ! d [2:0] $end"));
    assert!(out.contains("b101 !"));
}

#[test]
fn delta_limit_error_names_pending_signals() {
    struct Gate {
        input: SignalId,
        output: SignalId,
        invert: bool,
    }

    impl Module for Gate {
        fn on_state_change(&mut self, _port: PortId, circuit: &mut Circuit) {
            let v = circuit.read(self.input);
            circuit.write(self.output, if self.invert { !v } else { v });
        }
    }

    let mut k = SimKernel::new();
    k.set_max_delta(20);
    let a = k.circuit_mut().add_signal_with("osc_a", Low);
    let b = k.circuit_mut().add_signal_with("osc_b", Low);
    for (input, output, invert) in [(a, b, false), (b, a, true)] {
        k.add_module(|id, c| {
            c.subscribe(input, id, PortId(0), SignalEvent::StateChange);
            Gate {
                input,
                output,
                invert,
            }
        });
    }
    k.set_stop_time(5);
    k.circuit_mut().write(a, High);

    let err = k.start().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("after 20 deltas"), "{msg}");
    match err {
        SimError::DeltaCycleLimit { time, signals, .. } => {
            assert_eq!(time, 0);
            assert_eq!(signals.len(), 1);
            assert!(signals[0].starts_with("osc_"));
        }
        other => panic!("expected delta limit, got {other}"),
    }
}
