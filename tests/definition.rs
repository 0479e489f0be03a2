use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use lazy_slot::{CacheDefinition, CacheIdentity, DefinitionError, SlotState, SlotStore};

#[test]
fn test_access_runs_loader_once() {
   let counter = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&counter);
   let definition = CacheDefinition::define("definition_tests::once", move || {
      loads.fetch_add(1, Ordering::SeqCst);
      vec![String::from("Specialty Three"), String::from("Specialty Four")]
   })
   .unwrap();

   assert_eq!(definition.access(), ["Specialty Three", "Specialty Four"]);
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   // Second call is served from the slot
   assert_eq!(definition.access(), ["Specialty Three", "Specialty Four"]);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_empty_results_are_not_recomputed() {
   let counter = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&counter);
   let definition = CacheDefinition::define("definition_tests::empty_vec", move || {
      loads.fetch_add(1, Ordering::SeqCst);
      Vec::<u8>::new()
   })
   .unwrap();

   assert!(definition.access().is_empty());
   assert!(definition.access().is_empty());
   assert_eq!(definition.cached(), SlotState::Filled(Vec::new()));
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   let zero_loads = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&zero_loads);
   let definition = CacheDefinition::define("definition_tests::none", move || {
      loads.fetch_add(1, Ordering::SeqCst);
      None::<u32>
   })
   .unwrap();

   assert_eq!(definition.access(), None);
   assert_eq!(definition.access(), None);
   assert_eq!(zero_loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_definitions_are_isolated() {
   let first = CacheDefinition::define("definition_tests::specialties_one", || {
      vec!["Specialty One", "Specialty Two"]
   })
   .unwrap();
   let second = CacheDefinition::define("definition_tests::specialties_two", || {
      vec!["Specialty Three", "Specialty Four"]
   })
   .unwrap();
   assert_ne!(first.identity(), second.identity());

   assert_eq!(first.access(), ["Specialty One", "Specialty Two"]);
   assert_eq!(second.cached(), SlotState::Empty);
   assert_eq!(second.access(), ["Specialty Three", "Specialty Four"]);
   assert_eq!(first.access(), ["Specialty One", "Specialty Two"]);
}

#[test]
fn test_load_bypasses_slot() {
   let counter = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&counter);
   let definition = CacheDefinition::define("definition_tests::bypass", move || {
      loads.fetch_add(1, Ordering::SeqCst) + 100
   })
   .unwrap();

   assert_eq!(definition.load(), 100);
   assert_eq!(definition.cached(), SlotState::Empty);

   assert_eq!(definition.access(), 101);
   assert_eq!(definition.load(), 102);
   // The slot keeps the value produced through `access`
   assert_eq!(definition.access(), 101);
   assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_store_is_the_started_slot() {
   let definition: CacheDefinition<u16, _> =
      CacheDefinition::define("definition_tests::store", || 16).unwrap();
   let identity = definition.identity();
   assert!(!SlotStore::<u16>::is_started(identity));

   let store = definition.store();
   assert!(SlotStore::<u16>::is_started(identity));
   assert!(std::ptr::eq(store, SlotStore::<u16>::ensure_started(identity)));

   // Writing through the store is visible to the accessor
   store.set(61);
   assert_eq!(definition.access(), 61);
}

#[test]
fn test_store_is_looked_up_once() {
   let definition: Arc<CacheDefinition<u32, _>> =
      Arc::new(CacheDefinition::define("definition_tests::memoized", || 32).unwrap());
   let first = definition.store();
   assert!(std::ptr::eq(first, definition.store()));
   assert_eq!(definition.access(), 32);

   let barrier = Arc::new(Barrier::new(8));
   let threads: Vec<_> = (0..8)
      .map(|_| {
         let definition = Arc::clone(&definition);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            let mut addresses = HashSet::new();
            for _ in 0..1000 {
               assert_eq!(definition.access(), 32);
               addresses.insert(definition.store() as *const SlotStore<u32> as usize);
            }
            addresses
         })
      })
      .collect();

   let first = first as *const SlotStore<u32> as usize;
   for handle in threads {
      assert_eq!(handle.join().unwrap(), HashSet::from([first]));
   }
}

#[test]
fn test_marked_identities_are_distinct() {
   struct First;
   struct Second;

   let path = "definition_tests::marked";
   let first = CacheIdentity::with_marker::<First>(path);
   let second = CacheIdentity::with_marker::<Second>(path);
   let bare = CacheIdentity::new(path);

   assert_eq!(first, CacheIdentity::with_marker::<First>(path));
   assert_ne!(first, second);
   assert_ne!(first, bare);
   assert!(first.is_marked());
   assert!(!bare.is_marked());
   assert_eq!(first.as_str(), bare.as_str());
   assert_eq!(first.name(), "marked");

   // Same path and value type, still separate slots
   let one = SlotStore::<u8>::ensure_started(first);
   let two = SlotStore::<u8>::ensure_started(second);
   assert!(!std::ptr::eq(one, two));
   one.set(1);
   assert_eq!(two.get(), SlotState::Empty);
   assert_eq!(SlotStore::<u8>::ensure_started(bare).get(), SlotState::Empty);
}

#[test]
fn test_define_rejects_malformed_identity() {
   let result: Result<CacheDefinition<u8, _>, _> = CacheDefinition::define("", || 0);
   assert_eq!(result.unwrap_err(), DefinitionError::EmptyIdentity);

   let result: Result<CacheDefinition<u8, _>, _> =
      CacheDefinition::define("definition_tests::bad name", || 0);
   assert_eq!(
      result.unwrap_err(),
      DefinitionError::InvalidSegment {
         identity: "definition_tests::bad name",
         segment: "bad name",
      }
   );

   let result: Result<CacheDefinition<u8, _>, _> =
      CacheDefinition::define("definition_tests::::double", || 0);
   assert!(matches!(
      result.unwrap_err(),
      DefinitionError::InvalidSegment { segment: "", .. }
   ));

   let result: Result<CacheDefinition<u8, _>, _> = CacheDefinition::define("9lives", || 0);
   assert!(matches!(result, Err(DefinitionError::InvalidSegment { .. })));
}

#[test]
fn test_define_rejects_duplicate_identity() {
   let first: CacheDefinition<u8, _> =
      CacheDefinition::define("definition_tests::duplicate", || 1).unwrap();
   let second: Result<CacheDefinition<u8, _>, _> =
      CacheDefinition::define("definition_tests::duplicate", || 2);

   let err = second.unwrap_err();
   assert_eq!(err, DefinitionError::DuplicateIdentity(first.identity()));
   assert_eq!(
      err.to_string(),
      "cache identity `definition_tests::duplicate` is already defined"
   );

   // The surviving definition is unaffected
   assert_eq!(first.access(), 1);
}

#[test]
fn test_define_rejects_started_identity() {
   let identity = CacheIdentity::new("definition_tests::already_started");
   SlotStore::<u8>::ensure_started(identity);

   let result: Result<CacheDefinition<u8, _>, _> =
      CacheDefinition::define("definition_tests::already_started", || 0);
   assert_eq!(result.unwrap_err(), DefinitionError::DuplicateIdentity(identity));
}

#[test]
fn test_unclaimed_definitions_share_keyed_slot() {
   let identity = CacheIdentity::new("definition_tests::keyed");
   let first = CacheDefinition::new(identity, || 1u32);
   let second = CacheDefinition::new(identity, || 2u32);

   assert_eq!(first.access(), 1);
   // Same identity, same slot: the second loader never runs
   assert_eq!(second.access(), 1);
}

#[test]
fn test_panicking_loader_leaves_slot_empty() {
   let counter = Arc::new(AtomicUsize::new(0));
   let should_fail = Arc::new(AtomicBool::new(true));
   let loads = Arc::clone(&counter);
   let fail = Arc::clone(&should_fail);
   let definition = CacheDefinition::define("definition_tests::panicking", move || {
      loads.fetch_add(1, Ordering::SeqCst);
      if fail.swap(false, Ordering::SeqCst) {
         panic!("loader failed");
      }
      String::from("recovered")
   })
   .unwrap();

   let result = panic::catch_unwind(AssertUnwindSafe(|| definition.access()));
   assert!(result.is_err());
   assert_eq!(definition.cached(), SlotState::Empty);
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   // The next access retries the loader
   assert_eq!(definition.access(), "recovered");
   assert_eq!(definition.access(), "recovered");
   assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_try_access_does_not_cache_errors() {
   let counter = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&counter);
   let definition = CacheDefinition::define("definition_tests::fallible", move || {
      match loads.fetch_add(1, Ordering::SeqCst) {
         0 => Err("init error"),
         n => Ok(n * 10),
      }
   })
   .unwrap();

   assert_eq!(definition.try_access(), Err("init error"));
   assert_eq!(definition.cached(), SlotState::Empty);

   assert_eq!(definition.try_access(), Ok(10));
   assert_eq!(definition.try_access(), Ok(10));
   assert_eq!(definition.cached(), SlotState::Filled(10));
   assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_race_converges_to_single_value() {
   const THREADS: usize = 8;

   let counter = Arc::new(AtomicUsize::new(0));
   let produced = Arc::new(Mutex::new(HashSet::new()));
   let loads = Arc::clone(&counter);
   let produced_by_loader = Arc::clone(&produced);
   let definition = Arc::new(
      CacheDefinition::define("definition_tests::race", move || {
         let value = loads.fetch_add(1, Ordering::SeqCst);
         // Keep the loader slow so first accesses overlap
         thread::sleep(Duration::from_millis(20));
         produced_by_loader.lock().unwrap().insert(value);
         value
      })
      .unwrap(),
   );

   let barrier = Arc::new(Barrier::new(THREADS));
   let threads: Vec<_> = (0..THREADS)
      .map(|_| {
         let definition = Arc::clone(&definition);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            definition.access()
         })
      })
      .collect();

   for handle in threads {
      let value = handle.join().unwrap();
      // Every racer returns a value some loader run produced
      assert!(produced.lock().unwrap().contains(&value));
   }

   let runs = counter.load(Ordering::SeqCst);
   assert!((1..=THREADS).contains(&runs), "loader ran {runs} times");

   // After the race settles every access agrees and the loader stays idle
   let settled = definition.access();
   assert!(produced.lock().unwrap().contains(&settled));
   for _ in 0..10 {
      assert_eq!(definition.access(), settled);
   }
   assert_eq!(counter.load(Ordering::SeqCst), runs);
}

#[test]
fn test_identity_parts() {
   let identity = CacheIdentity::parse("clinic::catalog::specialties").unwrap();
   assert_eq!(identity.as_str(), "clinic::catalog::specialties");
   assert_eq!(identity.name(), "specialties");
   assert_eq!(identity.namespace(), Some("clinic::catalog"));
   assert_eq!(identity.to_string(), "clinic::catalog::specialties");

   let bare = CacheIdentity::new("specialties");
   assert_eq!(bare.name(), "specialties");
   assert_eq!(bare.namespace(), None);
}

#[test]
fn test_definition_debug() {
   let definition =
      CacheDefinition::<u8, _>::new(CacheIdentity::new("definition_tests::debug"), || 0u8);
   assert_eq!(
      format!("{definition:?}"),
      "CacheDefinition { identity: CacheIdentity(\"definition_tests::debug\"), .. }"
   );
}

#[tokio::test]
async fn test_access_async() {
   let counter = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&counter);
   let definition = CacheDefinition::define("definition_tests::async", move || {
      let loads = Arc::clone(&loads);
      async move {
         loads.fetch_add(1, Ordering::SeqCst);
         tokio::time::sleep(Duration::from_millis(10)).await;
         String::from("async value")
      }
   })
   .unwrap();

   assert_eq!(definition.access_async().await, "async value");
   assert_eq!(definition.access_async().await, "async value");
   assert_eq!(definition.cached(), SlotState::Filled(String::from("async value")));
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_access_async_race_converges() {
   let counter = Arc::new(AtomicUsize::new(0));
   let loads = Arc::clone(&counter);
   let definition = Arc::new(
      CacheDefinition::define("definition_tests::async_race", move || {
         let loads = Arc::clone(&loads);
         async move {
            let value = loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            value
         }
      })
      .unwrap(),
   );

   let tasks: Vec<_> = (0..8)
      .map(|_| {
         let definition = Arc::clone(&definition);
         tokio::spawn(async move { definition.access_async().await })
      })
      .collect();
   for task in tasks {
      task.await.unwrap();
   }

   let runs = counter.load(Ordering::SeqCst);
   assert!((1..=8).contains(&runs));
   let settled = definition.access_async().await;
   assert!(settled < runs);
   assert_eq!(definition.access_async().await, settled);
   assert_eq!(counter.load(Ordering::SeqCst), runs);
}
