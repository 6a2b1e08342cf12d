// runner-image-cli: builds runner images and verifies that a container started
// from one registers as an online self-hosted runner.
//
// Flow:
//   main → CommandSettings → Workflow::execute → Builder::build
//                                             → Verifier::verify (--test / --test-full)
//   example_main → ExampleSuite::run

pub mod builder;
pub mod command_settings;
pub mod container;
pub mod example_suite;
pub mod identity;
pub mod registry;
pub mod repository_root;
pub mod verifier;
pub mod workflow;

#[cfg(test)]
mod testing;
