use osc_pair_monitor::{encode, OscArg, Param};
use rand::Rng;
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

const USAGE: &str = "usage: send_pair [target=127.0.0.1:8889] [pairs=100] [mismatch_rate=0.0]";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "127.0.0.1:8889".to_string());
    let pairs: u32 = match args.next() {
        Some(s) => s.parse().map_err(|_| anyhow::anyhow!(USAGE))?,
        None => 100,
    };
    let mismatch_rate: f64 = match args.next() {
        Some(s) => s.parse().map_err(|_| anyhow::anyhow!(USAGE))?,
        None => 0.0,
    };

    println!("Sending {} eye X pairs to {}", pairs, target);

    let sock = UdpSocket::bind("0.0.0.0:0")?;
    sock.connect(&target)?;

    let mut rng = rand::thread_rng();
    let mut mismatches = 0;

    for i in 0..pairs {
        let x: f32 = (i as f32 * 0.1).sin() * 0.5;
        let right = if rng.gen_bool(mismatch_rate.clamp(0.0, 1.0)) {
            mismatches += 1;
            x + rng.gen_range(0.01..0.1)
        } else {
            x
        };

        // Auxiliary values first, then the pair in a random order.
        for (param, value) in [
            (Param::EyeLeftY, rng.gen_range(-0.2..0.2)),
            (Param::EyeRightY, rng.gen_range(-0.2..0.2)),
            (Param::EyeLidLeft, rng.gen_range(0.8..1.0)),
            (Param::EyeLidRight, rng.gen_range(0.8..1.0)),
            (Param::PupilDilation, rng.gen_range(0.3..0.6)),
        ] {
            sock.send(&encode(&param.path(), &[OscArg::Float(value)])?)?;
        }

        let mut pair = [(Param::EyeLeftX, x), (Param::EyeRightX, right)];
        if rng.gen_bool(0.5) {
            pair.swap(0, 1);
        }
        for (param, value) in pair {
            sock.send(&encode(&param.path(), &[OscArg::Float(value)])?)?;
        }

        thread::sleep(Duration::from_millis(10));
    }

    println!("Sent {} pairs ({} with injected mismatch)", pairs, mismatches);
    Ok(())
}
