use std::fs;
use std::time::Duration;

use ssd_core::layout::SsdLayout;
use ssd_core::lock::DeviceLock;
use ssd_core::{BlockArray, BufferedSsd, MemoryBuffer, ResultRegister, Ssd, SsdError};

fn open(dir: &tempfile::TempDir) -> Ssd {
    Ssd::open(SsdLayout::new(dir.path())).unwrap()
}

fn run(ssd: &mut Ssd, line: &str) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    ssd.run(&tokens).unwrap().to_string()
}

fn slot_names(ssd: &mut Ssd) -> Vec<String> {
    let (slots, _) = ssd.inspect().unwrap();
    slots.iter().map(ToString::to_string).collect()
}

#[test]
fn first_open_materializes_device_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut ssd = open(&dir);

    let nand = fs::read_to_string(dir.path().join("ssd_nand.txt")).unwrap();
    assert_eq!(nand.lines().count(), 100);
    assert!(nand.lines().all(|line| line.ends_with("\t0x00000000")));

    assert_eq!(
        slot_names(&mut ssd),
        ["1_empty", "2_empty", "3_empty", "4_empty", "5_empty"]
    );
}

#[test]
fn flushed_write_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut ssd = open(&dir);
        assert_eq!(run(&mut ssd, "W 42 0xAABBCCDD"), "");
        assert_eq!(run(&mut ssd, "F"), "");
    }
    let nand = fs::read_to_string(dir.path().join("ssd_nand.txt")).unwrap();
    assert!(nand.contains("42\t0xAABBCCDD\n"));

    let mut ssd = open(&dir);
    assert_eq!(run(&mut ssd, "R 42"), "0xAABBCCDD");
    assert_eq!(
        fs::read_to_string(dir.path().join("ssd_output.txt")).unwrap(),
        "0xAABBCCDD"
    );
}

#[test]
fn buffered_write_survives_restart_without_flush() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut ssd = open(&dir);
        run(&mut ssd, "W 7 0x00C0FFEE");
    }
    let nand = fs::read_to_string(dir.path().join("ssd_nand.txt")).unwrap();
    assert!(nand.contains("7\t0x00000000\n"));

    let mut ssd = open(&dir);
    assert_eq!(run(&mut ssd, "R 7"), "0x00C0FFEE");
}

#[test]
fn sixth_command_triggers_one_flush() {
    let dir = tempfile::tempdir().unwrap();
    let mut ssd = open(&dir);
    for lba in 0..4 {
        run(&mut ssd, &format!("W {lba} 0x1111111{lba}"));
    }
    run(&mut ssd, "E 50 5");
    assert_eq!(slot_names(&mut ssd)[4], "5_E_50_5");

    run(&mut ssd, "W 80 0x80808080");
    assert_eq!(
        slot_names(&mut ssd),
        ["1_W_80_0x80808080", "2_empty", "3_empty", "4_empty", "5_empty"]
    );

    let (_, array) = ssd.inspect().unwrap();
    for lba in 0..4 {
        assert_eq!(array.get(lba).unwrap().as_str(), format!("0x1111111{lba}"));
    }
    assert!(array.get(80).unwrap().is_zero());
}

#[test]
fn write_trims_the_head_of_a_pending_erase() {
    let dir = tempfile::tempdir().unwrap();
    let mut ssd = open(&dir);
    run(&mut ssd, "E 12 2");
    run(&mut ssd, "W 12 0xAAAABBBB");
    assert_eq!(
        slot_names(&mut ssd),
        ["1_E_13_1", "2_W_12_0xAAAABBBB", "3_empty", "4_empty", "5_empty"]
    );
    assert_eq!(run(&mut ssd, "R 12"), "0xAAAABBBB");
    assert_eq!(run(&mut ssd, "R 13"), "0x00000000");
}

#[test]
fn overlapping_erases_coalesce_up_to_ten() {
    let dir = tempfile::tempdir().unwrap();
    let mut ssd = open(&dir);
    run(&mut ssd, "E 16 9");
    run(&mut ssd, "E 22 4");
    assert_eq!(slot_names(&mut ssd)[..2], ["1_E_16_10", "2_empty"]);

    run(&mut ssd, "E 22 5");
    assert_eq!(slot_names(&mut ssd)[..2], ["1_E_16_10", "2_E_22_5"]);
}

#[test]
fn invalid_command_writes_error_and_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut ssd = open(&dir);
    run(&mut ssd, "W 1 0x00000001");

    for line in ["W 100 0x00000001", "E 0 11", "Z", "R 1 2"] {
        assert_eq!(run(&mut ssd, line), "ERROR", "{line}");
        assert_eq!(
            fs::read_to_string(dir.path().join("ssd_output.txt")).unwrap(),
            "ERROR"
        );
    }
    assert_eq!(slot_names(&mut ssd)[0], "1_W_1_0x00000001");
}

#[test]
fn format_resets_array_and_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let mut ssd = open(&dir);
    run(&mut ssd, "W 3 0x00000003");
    run(&mut ssd, "F");
    run(&mut ssd, "W 4 0x00000004");

    ssd.format().unwrap();
    let (slots, array) = ssd.inspect().unwrap();
    assert!(slots.iter().all(|slot| slot.to_string().ends_with("_empty")));
    assert_eq!(array, BlockArray::new());
}

#[test]
fn held_lock_fails_the_command() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SsdLayout::new(dir.path()).with_lock_timeout(Duration::from_millis(50));
    let mut ssd = Ssd::open(layout.clone()).unwrap();

    let _held = DeviceLock::acquire(layout.lock_path(), Duration::from_secs(1)).unwrap();
    let err = ssd.run(&["W", "1", "0x00000001"]).unwrap_err();
    assert!(matches!(err, SsdError::LockTimeout { .. }));
    assert_eq!(
        fs::read_to_string(layout.output_path()).unwrap(),
        "ERROR"
    );
}

#[test]
fn every_lba_reads_back_its_latest_value() {
    let mut ssd = BufferedSsd::new(BlockArray::new(), MemoryBuffer::new());
    for lba in 0..100 {
        let value = format!("0x{:08X}", lba * 7919);
        assert_eq!(
            ssd.process(&["W".to_string(), lba.to_string(), value.clone()]),
            ResultRegister::Done
        );
        assert_eq!(ssd.process(&["R".to_string(), lba.to_string()]).to_string(), value);

        assert_eq!(
            ssd.process(&["E".to_string(), lba.to_string(), "1".to_string()]),
            ResultRegister::Done
        );
        assert_eq!(
            ssd.process(&["R".to_string(), lba.to_string()]).to_string(),
            "0x00000000"
        );
        assert!(ssd.pending().unwrap().len() <= 5);
    }
}
