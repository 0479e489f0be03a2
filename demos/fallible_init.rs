use std::sync::atomic::{AtomicBool, Ordering};

use lazy_slot::{define_try_cache, SlotState, SlotStore};

static FAIL: AtomicBool = AtomicBool::new(true);

define_try_cache! {
   fn config() -> Result<String, &'static str> {
      let fail = FAIL.load(Ordering::Relaxed);
      println!("Attempting load (fail={fail})...");
      if fail {
         Err("Load failed!")
      } else {
         Ok(String::from("Successfully loaded"))
      }
   }
}

fn main() {
   let slot = SlotStore::<String>::ensure_started(config::IDENTITY);

   // First attempt fails and leaves the slot empty
   match config() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert_eq!(slot.get(), SlotState::Empty);

   // Second attempt succeeds
   FAIL.store(false, Ordering::Relaxed);
   match config() {
      Ok(data) => println!("Got data: {data}"),
      Err(_) => panic!("Should have succeeded"),
   }
   assert_eq!(slot.get(), SlotState::Filled(String::from("Successfully loaded")));

   // Later calls are served from the slot, even if the loader would now fail
   FAIL.store(true, Ordering::Relaxed);
   match config() {
      Ok(data) => println!("Got data again: {data}"),
      Err(_) => panic!("Should have returned cached data"),
   }
}
