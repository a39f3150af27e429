pub mod builtin;
pub mod dispatcher;
pub mod handler;
pub mod local;
pub mod osm;
pub mod registry;
pub mod translate;
pub mod tripadvisor;

pub use dispatcher::{Dispatcher, ToolCallRequest, ToolCallResult};
pub use handler::{decode_args, CallBudget, ToolDescriptor, ToolHandler};
pub use registry::ToolRegistry;

use crate::config::ToolSet;
use crate::error::RegistryError;

/// Build the registry for one deployment. The front-end is shared; only the
/// tool set changes.
pub fn build_registry(tool_set: ToolSet) -> Result<ToolRegistry, RegistryError> {
    let mut reg = ToolRegistry::new();

    match tool_set {
        ToolSet::Osm => {
            register_time(&mut reg)?;
            register_osm(&mut reg)?;
        }
        ToolSet::Tripadvisor => {
            register_time(&mut reg)?;
            reg.register(
                tripadvisor::SearchRestaurants::descriptor(),
                tripadvisor::SearchRestaurants::budget(),
                tripadvisor::SearchRestaurants,
            )?;
            reg.register(
                tripadvisor::RestaurantDetails::descriptor(),
                tripadvisor::RestaurantDetails::budget(),
                tripadvisor::RestaurantDetails,
            )?;
            reg.register(
                tripadvisor::RestaurantReviews::descriptor(),
                tripadvisor::RestaurantReviews::budget(),
                tripadvisor::RestaurantReviews,
            )?;
        }
        ToolSet::Joint => {
            register_time(&mut reg)?;
            register_osm(&mut reg)?;
            register_translate(&mut reg)?;
            reg.register(builtin::Ping::descriptor(), builtin::Ping::budget(), builtin::Ping)?;
        }
        ToolSet::Translator => {
            register_translate(&mut reg)?;
        }
        ToolSet::Local => {
            reg.register(local::Calculator::descriptor(), local::Calculator::budget(), local::Calculator)?;
            reg.register(
                local::CurrentDatetime::descriptor(),
                local::CurrentDatetime::budget(),
                local::CurrentDatetime,
            )?;
            reg.register(local::GetWeather::descriptor(), local::GetWeather::budget(), local::GetWeather)?;
        }
    }
    Ok(reg)
}

fn register_time(reg: &mut ToolRegistry) -> Result<(), RegistryError> {
    reg.register(builtin::CurrentTime::descriptor(), builtin::CurrentTime::budget(), builtin::CurrentTime)
}

fn register_translate(reg: &mut ToolRegistry) -> Result<(), RegistryError> {
    reg.register(
        translate::TranslateJaToEn::descriptor(),
        translate::TranslateJaToEn::budget(),
        translate::TranslateJaToEn,
    )
}

fn register_osm(reg: &mut ToolRegistry) -> Result<(), RegistryError> {
    reg.register(
        osm::SearchRestaurants::descriptor(),
        osm::SearchRestaurants::budget(),
        osm::SearchRestaurants,
    )?;
    reg.register(
        osm::PlaceDetails::descriptor(),
        osm::PlaceDetails::budget(),
        osm::PlaceDetails,
    )
}
