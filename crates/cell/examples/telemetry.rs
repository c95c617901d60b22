use spincell::SpinCell;
use std::sync::Arc;

// This example shows a render loop publishing per-frame statistics through a
// cell while several observer threads sample the latest snapshot.
#[derive(Clone, Debug, Default)]
struct FrameStats {
    frame: u64,
    draw_calls: u32,
    frame_micros: u64,
}

fn main() {
    let stats = Arc::new(SpinCell::<FrameStats>::default());
    let num_observers = 3;

    // Observers sample whatever snapshot is current when they wake up.
    let observers: Vec<_> = (0..num_observers)
        .map(|index| {
            std::thread::spawn({
                let stats = stats.clone();
                move || {
                    let mut last_frame = 0;
                    loop {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        let snapshot = stats.get();
                        if snapshot.frame == u64::MAX {
                            return;
                        }
                        assert!(snapshot.frame >= last_frame);
                        last_frame = snapshot.frame;
                        if snapshot.frame % 100 == 0 {
                            eprintln!("observer {index}: {snapshot:?}");
                        }
                    }
                }
            })
        })
        .collect();

    // The render loop publishes a fresh snapshot every frame.
    for frame in 1..=600 {
        std::thread::sleep(std::time::Duration::from_millis(1));
        stats.write(FrameStats {
            frame,
            draw_calls: 32 + (frame % 7) as u32,
            frame_micros: 950 + frame % 130,
        });
    }

    // A frame of u64::MAX tells the observers to shut down.
    stats.write(FrameStats {
        frame: u64::MAX,
        ..FrameStats::default()
    });
    for observer in observers {
        observer.join().unwrap();
    }
}
