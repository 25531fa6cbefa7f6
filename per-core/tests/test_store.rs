use anyhow::Result;
use per_core::{PerConfig, PriorityStore, ReplayError, StoreSnapshot};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn store_with(capacity: usize, alpha: f32, td_errs: &[f32]) -> Result<PriorityStore<usize, usize>> {
    let mut store = PriorityStore::new(capacity, alpha, 1e-6)?;
    for (i, &td_err) in td_errs.iter().enumerate() {
        store.add(i, 0, 1.0, i + 1, false, td_err)?;
    }
    Ok(store)
}

#[test]
fn test_zero_td_error_has_positive_priority() -> Result<()> {
    init();
    let store = store_with(10, 0.6, &[0.0])?;
    let p = store.priority(0).unwrap();
    assert!(p > 0.0);
    assert!((p - 1e-6f32.powf(0.6)).abs() < 1e-7);
    assert_eq!(store.get(0).unwrap().priority, p);
    Ok(())
}

#[test]
fn test_ring_overwrite() -> Result<()> {
    init();
    let mut store = PriorityStore::new(3, 0.6, 1e-6)?;
    let slots = (0..4)
        .map(|i| store.add(i, 0, 1.0, i + 1, false, 1.0))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(slots, vec![0, 1, 2, 0]);
    assert_eq!(store.len(), 3);
    assert_eq!(store.write_cursor(), 1);
    assert!(store.is_full());

    let tr = store.get(0).unwrap();
    assert_eq!(tr.state, 3);
    assert_eq!(tr.sequence_number, 3);
    assert_eq!(store.get(1).unwrap().state, 1);
    Ok(())
}

#[test]
fn test_total_priority_after_overwrites() -> Result<()> {
    init();
    let td_errs = [0.3, -1.2, 0.0, 2.5, 0.7, -0.1, 4.0, 0.05, 1.0, 0.2];
    let store = store_with(4, 0.6, &td_errs)?;

    assert_eq!(store.len(), 4);
    let sum = store.priorities().iter().sum::<f32>();
    assert!((store.total_priority() - sum).abs() < 1e-5);

    // Slots hold the last four transitions
    let expected = td_errs[6..]
        .iter()
        .map(|e| store.priority_of(*e))
        .collect::<Vec<_>>();
    let mut actual = store.priorities();
    actual.rotate_left(store.write_cursor());
    for (p, q) in actual.iter().zip(expected.iter()) {
        assert!((p - q).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn test_max_priority_is_recomputed() -> Result<()> {
    init();
    let mut store = store_with(3, 1.0, &[0.1, 0.9, 0.2])?;
    assert!((store.max_priority() - 0.9).abs() < 1e-5);

    // Overwrites slot 0
    assert_eq!(store.add(3, 0, 1.0, 4, false, 0.05)?, 0);
    assert!((store.max_priority() - 0.9).abs() < 1e-5);

    // Lowering the slot holding the maximum
    store.refresh(1, 0.01)?;
    assert!((store.max_priority() - 0.2).abs() < 1e-5);
    assert!((store.min_priority() - 0.01).abs() < 1e-5);
    Ok(())
}

#[test]
fn test_max_priority_after_overwriting_the_maximum() -> Result<()> {
    init();
    let mut store = store_with(2, 1.0, &[3.0, 0.5])?;
    assert!((store.max_priority() - 3.0).abs() < 1e-5);

    // Overwrites slot 0, which held the maximum
    store.add(2, 0, 1.0, 3, false, 0.1)?;
    assert!((store.max_priority() - 0.5).abs() < 1e-5);
    Ok(())
}

#[test]
fn test_empty_store() -> Result<()> {
    let store = PriorityStore::<usize, usize>::from_config(5, &PerConfig::default())?;
    assert!(store.is_empty());
    assert_eq!(store.total_priority(), 0.0);
    assert_eq!(store.max_priority(), 0.0);
    assert_eq!(store.min_priority(), 0.0);
    assert_eq!(store.priority(0), None);
    assert!(store.get(0).is_none());
    Ok(())
}

#[test]
fn test_invalid_parameters() {
    assert!(matches!(
        PriorityStore::<usize, usize>::new(0, 0.6, 1e-6),
        Err(ReplayError::Configuration(_))
    ));
    assert!(matches!(
        PriorityStore::<usize, usize>::new(10, -1.0, 1e-6),
        Err(ReplayError::Configuration(_))
    ));
    assert!(matches!(
        PriorityStore::<usize, usize>::new(10, 0.6, 0.0),
        Err(ReplayError::Configuration(_))
    ));
}

#[test]
fn test_contract_violations_leave_the_store_unchanged() -> Result<()> {
    init();
    let mut store = store_with(4, 0.6, &[0.5, 1.0])?;
    let priorities = store.priorities();

    assert!(matches!(
        store.refresh(2, 1.0),
        Err(ReplayError::ContractViolation(_))
    ));
    assert!(matches!(
        store.refresh(0, f32::NAN),
        Err(ReplayError::ContractViolation(_))
    ));
    assert!(matches!(
        store.add(9, 0, 0.0, 9, true, f32::INFINITY),
        Err(ReplayError::ContractViolation(_))
    ));

    assert_eq!(store.len(), 2);
    assert_eq!(store.write_cursor(), 2);
    assert_eq!(store.priorities(), priorities);
    Ok(())
}

#[test]
fn test_snapshot_restore() -> Result<()> {
    init();
    let mut store = store_with(3, 0.6, &[0.5, 1.0, 2.0, 0.25])?;
    store.refresh(2, 0.1)?;

    let yaml = serde_yaml::to_string(&store.snapshot())?;
    let snapshot: StoreSnapshot<usize, usize> = serde_yaml::from_str(&yaml)?;
    let restored = PriorityStore::from_snapshot(snapshot)?;

    assert_eq!(restored.len(), store.len());
    assert_eq!(restored.write_cursor(), store.write_cursor());
    assert_eq!(restored.priorities(), store.priorities());
    assert_eq!(restored.max_priority(), store.max_priority());
    assert!((restored.total_priority() - store.total_priority()).abs() < 1e-6);
    assert_eq!(restored.get(0), store.get(0));

    // Sequence numbers continue
    let mut restored = restored;
    restored.add(4, 0, 1.0, 5, false, 1.0)?;
    assert_eq!(restored.get(1).unwrap().sequence_number, 4);
    Ok(())
}

#[test]
fn test_inconsistent_snapshot_is_rejected() -> Result<()> {
    let store = store_with(3, 0.6, &[0.5, 1.0])?;

    let mut snapshot = store.snapshot();
    snapshot.max_priority *= 2.0;
    assert!(matches!(
        PriorityStore::from_snapshot(snapshot),
        Err(ReplayError::ContractViolation(_))
    ));

    let mut snapshot = store.snapshot();
    snapshot.priorities.pop();
    assert!(PriorityStore::from_snapshot(snapshot).is_err());

    let mut snapshot = store.snapshot();
    snapshot.priorities[0] = 0.0;
    assert!(PriorityStore::from_snapshot(snapshot).is_err());
    Ok(())
}

#[test]
fn test_alpha_outside_unit_interval_is_rejected() {
    for &alpha in [1.5f32, 8.0, f32::NAN].iter() {
        assert!(matches!(
            PriorityStore::<usize, usize>::new(10, alpha, 1e-6),
            Err(ReplayError::Configuration(_))
        ));
        assert!(matches!(
            PriorityStore::<usize, usize>::from_config(10, &PerConfig::default().alpha(alpha)),
            Err(ReplayError::Configuration(_))
        ));
        assert!(PerConfig::default().alpha(alpha).validate().is_err());
    }
}

#[test]
fn test_zero_td_error_at_alpha_bounds() -> Result<()> {
    init();
    for &(alpha, expected) in [(1.0f32, 1e-6f32), (0.0, 1.0)].iter() {
        let store = store_with(4, alpha, &[0.0, 0.0, 2.0])?;
        let p = store.priority(0).unwrap();
        assert!(p > 0.0);
        assert!((p - expected).abs() < 1e-7);
        assert!(store.min_priority() > 0.0);

        // The live state can always be restored
        let restored = PriorityStore::from_snapshot(store.snapshot())?;
        assert_eq!(restored.priorities(), store.priorities());
    }
    Ok(())
}

#[test]
fn test_total_priority_overflow_is_rejected() -> Result<()> {
    init();
    let mut store = store_with(4, 1.0, &[3e38])?;
    assert!(matches!(
        store.add(1, 0, 1.0, 2, false, 3e38),
        Err(ReplayError::ContractViolation(_))
    ));
    assert_eq!(store.len(), 1);
    assert_eq!(store.write_cursor(), 1);
    assert!(store.total_priority().is_finite());

    store.add(1, 0, 1.0, 2, false, 0.1)?;
    assert!(matches!(
        store.refresh(1, 1e38),
        Err(ReplayError::ContractViolation(_))
    ));

    // Replacing the large priority frees room in the total
    store.refresh(0, 0.1)?;
    store.refresh(1, 3e38)?;
    assert!(store.total_priority().is_finite());
    Ok(())
}
