//! End-to-end runs over loopback UDP.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use osc_pair_monitor::{
    encode, FinalReport, MismatchEvent, Monitor, MonitorConfig, MonitorError, OscArg, Param,
    ReportSink, StatusObservation,
};

#[derive(Default)]
struct Recorder {
    mismatches: Mutex<Vec<MismatchEvent>>,
    statuses: Mutex<Vec<StatusObservation>>,
}

impl ReportSink for Recorder {
    fn mismatch(&self, event: &MismatchEvent) {
        self.mismatches.lock().unwrap().push(event.clone());
    }

    fn status(&self, observation: &StatusObservation) {
        self.statuses.lock().unwrap().push(observation.clone());
    }
}

fn test_config() -> MonitorConfig {
    MonitorConfig {
        port: 0,
        tolerance: 0.001,
        recv_timeout_ms: 50,
        status_interval_ms: 60_000,
        ..MonitorConfig::default()
    }
}

fn start() -> (Monitor, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let monitor = Monitor::start(&test_config(), recorder.clone()).unwrap();
    (monitor, recorder)
}

fn send(target: SocketAddr, packets: &[Vec<u8>]) {
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    for p in packets {
        sock.send_to(p, target).unwrap();
    }
}

fn packet(param: Param, value: f32) -> Vec<u8> {
    encode(&param.path(), &[OscArg::Float(value)]).unwrap()
}

fn wait_for_total(monitor: &Monitor, total: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while monitor.session().counters().total < total {
        assert!(Instant::now() < deadline, "timed out waiting for {total} samples");
        thread::sleep(Duration::from_millis(10));
    }
}

fn summary(report: FinalReport) -> osc_pair_monitor::Summary {
    match report {
        FinalReport::Collected(s) => s,
        FinalReport::NoSamples { .. } => panic!("expected samples"),
    }
}

#[test]
fn matching_pair_is_committed() {
    let (monitor, recorder) = start();
    send(
        monitor.local_addr(),
        &[packet(Param::EyeLeftX, 0.5), packet(Param::EyeRightX, 0.5003)],
    );
    wait_for_total(&monitor, 1);

    let stopped = monitor.stop();
    let s = summary(stopped.final_report());
    assert_eq!((s.total, s.matching, s.non_matching), (1, 1, 0));
    assert!((s.max_difference - 0.0003).abs() < 1e-6);
    assert!(recorder.mismatches.lock().unwrap().is_empty());
}

#[test]
fn mismatching_pair_raises_event() {
    let (monitor, recorder) = start();
    send(
        monitor.local_addr(),
        &[packet(Param::EyeLeftX, 0.5), packet(Param::EyeRightX, 0.503)],
    );
    wait_for_total(&monitor, 1);

    let stopped = monitor.stop();
    let s = summary(stopped.final_report());
    assert_eq!((s.total, s.matching, s.non_matching), (1, 0, 1));

    let events = recorder.mismatches.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].left_x, f64::from(0.5f32));
    assert_eq!(events[0].right_x, f64::from(0.503f32));
    assert!((events[0].difference - 0.003).abs() < 1e-6);
}

#[test]
fn no_packets_reports_no_samples() {
    let (monitor, _recorder) = start();
    let stopped = monitor.stop();

    let report = stopped.final_report();
    assert_eq!(report, FinalReport::NoSamples { tolerance: 0.001 });
    assert!(report.to_string().contains("No samples collected"));
}

#[test]
fn malformed_packet_is_dropped() {
    let (monitor, _recorder) = start();
    send(
        monitor.local_addr(),
        &[
            vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x11, 0x22],
            packet(Param::EyeLeftX, 0.25),
            packet(Param::EyeRightX, 0.25),
        ],
    );
    wait_for_total(&monitor, 1);
    // Give a stray extra commit the chance to show up.
    thread::sleep(Duration::from_millis(100));

    let stopped = monitor.stop();
    let s = summary(stopped.final_report());
    assert_eq!((s.total, s.matching), (1, 1));
    assert_eq!(stopped.session().samples().len(), 1);
}

#[test]
fn status_reporter_emits_observations() {
    let recorder = Arc::new(Recorder::default());
    let config = MonitorConfig {
        status_interval_ms: 20,
        ..test_config()
    };
    let monitor = Monitor::start(&config, recorder.clone()).unwrap();
    thread::sleep(Duration::from_millis(200));
    drop(monitor.stop());

    let statuses = recorder.statuses.lock().unwrap();
    assert!(!statuses.is_empty());
    assert!(statuses.iter().all(|s| *s == StatusObservation::AwaitingFirst));
}

#[test]
fn export_writes_one_row_per_sample() {
    let (monitor, _recorder) = start();
    send(
        monitor.local_addr(),
        &[
            packet(Param::PupilDilation, 0.4),
            packet(Param::EyeLeftX, 0.1),
            packet(Param::EyeRightX, 0.1),
        ],
    );
    wait_for_total(&monitor, 1);
    let stopped = monitor.stop();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("samples.csv");
    assert_eq!(stopped.export_csv(&path).unwrap(), 1);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "timestamp");
    assert_eq!(&headers[8], "pupil_dilation");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][8].parse::<f32>().unwrap(), 0.4);
    assert_eq!(&rows[0][4], "");
}

#[test]
fn export_failure_is_reported() {
    let (monitor, _recorder) = start();
    let stopped = monitor.stop();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("samples.csv");
    assert!(matches!(stopped.export_csv(&path), Err(MonitorError::Export(_))));
    assert_eq!(stopped.final_report(), FinalReport::NoSamples { tolerance: 0.001 });
}
