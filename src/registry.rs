//! The process-wide accessory table and its address index.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::{
    data_model::{
        accessory::Accessory,
        characteristic::{Characteristic, CharacteristicType},
        service::{Service, ServiceType},
    },
    interaction_model::{json, CharacteristicPath},
    Error, Result,
};

#[derive(Default)]
pub struct Registry {
    accessories: Vec<Accessory>,
    /// aid -> position in `accessories`
    by_aid: HashMap<u64, usize>,
    /// (aid, iid) -> path, one entry per characteristic
    by_iid: HashMap<(u64, u64), CharacteristicPath>,
    initialized: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of the accessory tree and indexes it. Can only succeed once.
    pub fn register(&mut self, accessories: Vec<Accessory>) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        let mut by_aid = HashMap::with_capacity(accessories.len());
        for (position, accessory) in accessories.iter().enumerate() {
            if by_aid.insert(accessory.id(), position).is_some() {
                return Err(Error::DuplicateId(accessory.id()));
            }
        }

        let mut by_iid = HashMap::new();
        for accessory in &accessories {
            let aid = accessory.id();
            for (s, service) in accessory.services().iter().enumerate() {
                for (c, characteristic) in service.characteristics().iter().enumerate() {
                    by_iid.insert(
                        (aid, characteristic.iid()),
                        CharacteristicPath::new(aid, s, c),
                    );
                }
            }
            debug!(
                "Indexed accessory {} ({:?}) with {} services",
                aid,
                accessory.name(),
                accessory.services().len()
            );
        }

        info!(
            "Registered {} accessories with {} characteristics",
            accessories.len(),
            by_iid.len()
        );
        self.accessories = accessories;
        self.by_aid = by_aid;
        self.by_iid = by_iid;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn accessories(&self) -> &[Accessory] {
        &self.accessories
    }

    pub fn accessory(&self, aid: u64) -> Result<&Accessory> {
        self.by_aid
            .get(&aid)
            .map(|&i| &self.accessories[i])
            .ok_or_else(|| Error::NotFound(format!("accessory {aid}")))
    }

    pub(crate) fn service_mut(&mut self, aid: u64, service: usize) -> Result<&mut Service> {
        let position = *self
            .by_aid
            .get(&aid)
            .ok_or_else(|| Error::NotFound(format!("accessory {aid}")))?;
        self.accessories[position]
            .get_mut(service)
            .ok_or_else(|| Error::NotFound(format!("{aid}.{service}")))
    }

    /// Number of indexed characteristics
    pub fn len(&self) -> usize {
        self.by_iid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_iid.is_empty()
    }

    /// Every characteristic path, in declaration order
    pub fn paths(&self) -> impl Iterator<Item = CharacteristicPath> + '_ {
        self.accessories.iter().flat_map(|accessory| {
            accessory
                .services()
                .iter()
                .enumerate()
                .flat_map(move |(s, service)| {
                    (0..service.characteristics().len())
                        .map(move |c| CharacteristicPath::new(accessory.id(), s, c))
                })
        })
    }

    pub fn resolve(
        &self,
        aid: u64,
        service: usize,
        characteristic: usize,
    ) -> Result<&Characteristic> {
        self.resolve_path(CharacteristicPath::new(aid, service, characteristic))
    }

    pub fn resolve_path(&self, path: CharacteristicPath) -> Result<&Characteristic> {
        self.accessory(path.aid)?
            .get(path.service)
            .and_then(|s| s.get(path.characteristic))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    pub(crate) fn resolve_mut(&mut self, path: CharacteristicPath) -> Result<&mut Characteristic> {
        self.service_mut(path.aid, path.service)?
            .get_mut(path.characteristic)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// First characteristic of `kind` on the accessory, in declaration order
    pub fn resolve_by_type(&self, aid: u64, kind: CharacteristicType) -> Result<&Characteristic> {
        self.resolve_path(self.locate(aid, kind)?)
    }

    pub fn resolve_in_service(
        &self,
        aid: u64,
        service: ServiceType,
        kind: CharacteristicType,
    ) -> Result<&Characteristic> {
        self.resolve_path(self.locate_in_service(aid, service, kind)?)
    }

    pub fn resolve_iid(&self, aid: u64, iid: u64) -> Result<&Characteristic> {
        self.resolve_path(self.locate_iid(aid, iid)?)
    }

    pub fn locate(&self, aid: u64, kind: CharacteristicType) -> Result<CharacteristicPath> {
        let accessory = self.accessory(aid)?;
        accessory
            .services()
            .iter()
            .enumerate()
            .find_map(|(s, service)| {
                service
                    .position(kind)
                    .map(|c| CharacteristicPath::new(aid, s, c))
            })
            .ok_or_else(|| Error::NotFound(format!("{kind:?} on accessory {aid}")))
    }

    pub fn locate_in_service(
        &self,
        aid: u64,
        service: ServiceType,
        kind: CharacteristicType,
    ) -> Result<CharacteristicPath> {
        let accessory = self.accessory(aid)?;
        let s = accessory
            .position(service)
            .ok_or_else(|| Error::NotFound(format!("{service:?} on accessory {aid}")))?;
        let c = accessory.services()[s]
            .position(kind)
            .ok_or_else(|| Error::NotFound(format!("{kind:?} in {service:?} on accessory {aid}")))?;
        Ok(CharacteristicPath::new(aid, s, c))
    }

    pub fn locate_iid(&self, aid: u64, iid: u64) -> Result<CharacteristicPath> {
        self.by_iid
            .get(&(aid, iid))
            .copied()
            .ok_or_else(|| Error::NotFound(format!("{aid}.{iid}")))
    }

    /// The accessory database served to controllers as `GET /accessories`
    pub fn database(&self) -> serde_json::Value {
        json::accessory_database(&self.accessories)
    }
}
