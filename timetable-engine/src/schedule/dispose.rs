//! Disposition resolution: wiring forms/triggers/static lineage between
//! scheduled trains and synthesizing the stabling and run-round trains those
//! directives imply.
//!
//! Resolution is deliberately order-dependent and runs in two passes over
//! the train list (AI trains in descriptor order, then the player train):
//! first all plain forms/triggers/static linkages, so a later train's target
//! can be an earlier train; then the stable and run-round synthesis, which
//! appends new trains to the live list.

use tracing::warn;

use crate::descriptor::dispose::{
    DisposeDirective, FormKind, FormsDirective, RunRound, RunRoundPosition, StableDirective,
    StableTermination,
};
use crate::route::{RouteCache, RouteService, Subpath};
use crate::schedule::train::{DetachOrder, FormLink, ScheduledTrain};
use crate::stock::CarDescriptor;

/// Decide whether a consist handed over from a train whose route ends on
/// `from` to a train whose route starts on `onto` must be reversed.
///
/// Walks backward from the end of `from` until a section also present in
/// `onto` is found; the hand-over reverses iff the shared section is
/// traversed in different directions. `None` when the subpaths share no
/// section at all.
pub fn formed_reverse(from: &Subpath, onto: &Subpath) -> Option<bool> {
    for element in from.elements.iter().rev() {
        if let Some(index) = onto.route_index(element.section, 0) {
            return Some(element.direction != onto.elements[index].direction);
        }
    }
    None
}

/// Resolve every dispose directive carried over from the descriptors.
/// Synthesized stabling (`SO_`/`SI_`) and run-round (`RR_`) trains are
/// appended to `trains` with numbers continuing after the existing ones.
pub fn resolve_dispositions(
    trains: &mut Vec<ScheduledTrain>,
    player: &mut ScheduledTrain,
    routes: &mut RouteCache,
    service: &dyn RouteService,
) {
    let next_number = trains
        .iter()
        .map(|t| t.number)
        .chain([player.number])
        .max()
        .unwrap_or(0)
        + 1;
    let mut resolver = Resolver {
        trains,
        player,
        routes,
        service,
        next_number,
    };
    resolver.link_pass();
    resolver.synthesis_pass();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrainRef {
    Player,
    Ai(usize),
}

struct Resolver<'a> {
    trains: &'a mut Vec<ScheduledTrain>,
    player: &'a mut ScheduledTrain,
    routes: &'a mut RouteCache,
    service: &'a dyn RouteService,
    next_number: usize,
}

impl Resolver<'_> {
    fn train(&self, train: TrainRef) -> &ScheduledTrain {
        match train {
            TrainRef::Player => self.player,
            TrainRef::Ai(index) => &self.trains[index],
        }
    }

    fn train_mut(&mut self, train: TrainRef) -> &mut ScheduledTrain {
        match train {
            TrainRef::Player => self.player,
            TrainRef::Ai(index) => &mut self.trains[index],
        }
    }

    fn find(&self, name: &str) -> Option<TrainRef> {
        self.trains
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
            .map(TrainRef::Ai)
            .or_else(|| {
                self.player
                    .name
                    .eq_ignore_ascii_case(name)
                    .then_some(TrainRef::Player)
            })
    }

    fn find_by_number(&self, number: usize) -> Option<TrainRef> {
        if self.player.number == number {
            return Some(TrainRef::Player);
        }
        self.trains
            .iter()
            .position(|t| t.number == number)
            .map(TrainRef::Ai)
    }

    fn alloc_number(&mut self) -> usize {
        let number = self.next_number;
        self.next_number += 1;
        number
    }

    /// Pass 1: plain forms/triggers/static linkage, in list order.
    fn link_pass(&mut self) {
        for acting in self.iteration_order() {
            let Some(directive) = self.train(acting).dispose.clone() else {
                continue;
            };
            match directive {
                DisposeDirective::Forms(forms) => self.link_forms(acting, &forms),
                DisposeDirective::Static => self.train_mut(acting).forms_static = true,
                // Stable cycles resolve their target during synthesis.
                DisposeDirective::Stable(_) => {}
            }
        }
    }

    /// Pass 2: stable and run-round synthesis. Appended trains become
    /// visible to later trains in the same pass.
    fn synthesis_pass(&mut self) {
        let mut index = 0;
        let mut player_done = false;
        loop {
            let acting = if index < self.trains.len() {
                TrainRef::Ai(index)
            } else if !player_done {
                player_done = true;
                TrainRef::Player
            } else {
                break;
            };
            if acting != TrainRef::Player {
                index += 1;
            }
            let Some(directive) = self.train_mut(acting).dispose.take() else {
                continue;
            };
            match directive {
                DisposeDirective::Forms(forms) => self.run_round_after_forms(acting, &forms),
                DisposeDirective::Stable(stable) => self.synthesize_stable(acting, &stable),
                DisposeDirective::Static => {}
            }
        }
    }

    fn iteration_order(&self) -> Vec<TrainRef> {
        let mut order: Vec<TrainRef> = (0..self.trains.len()).map(TrainRef::Ai).collect();
        order.push(TrainRef::Player);
        order
    }

    fn link_forms(&mut self, acting: TrainRef, directive: &FormsDirective) {
        let acting_name = self.train(acting).name.clone();
        let target_name = normalize_target(&directive.target, description_of(&acting_name));
        let Some(target) = self.find(&target_name) else {
            warn!(train = %acting_name, target = %target_name, "dispose target not found");
            return;
        };
        if target == acting {
            warn!(train = %acting_name, "train cannot form itself, link dropped");
            return;
        }
        if self.train(target).formed_of.is_some() {
            warn!(
                train = %acting_name,
                target = %target_name,
                "target already formed out of another train, link dropped"
            );
            return;
        }

        let acting_number = self.train(acting).number;
        let target_number = self.train(target).number;
        {
            let acting = self.train_mut(acting);
            acting.forms = Some(target_number);
            acting.set_stop = directive.set_stop;
            acting.forms_at_station = directive.at_station;
        }
        let target = self.train_mut(target);
        target.formed_of = Some(acting_number);
        target.formed_of_kind = match directive.kind {
            FormKind::Formed => FormLink::Formed,
            FormKind::Triggered => FormLink::Triggered,
        };
    }

    /// Run-round on a plain `$forms`: the maneuver happens on the formed
    /// train, before its departure.
    fn run_round_after_forms(&mut self, acting: TrainRef, directive: &FormsDirective) {
        let Some(run_round) = &directive.run_round else {
            return;
        };
        if directive.kind != FormKind::Formed {
            warn!(train = %self.train(acting).name, "run-round only applies to a formed successor, ignored");
            return;
        }
        // forms is unset when the link pass could not resolve the target.
        let Some(target_number) = self.train(acting).forms else {
            return;
        };
        let Some(used) = self.find_by_number(target_number) else {
            return;
        };
        self.synthesize_run_round(used, target_number, true, run_round);
    }

    fn synthesize_run_round(
        &mut self,
        used: TrainRef,
        attach_to: usize,
        at_start: bool,
        run_round: &RunRound,
    ) {
        let route = match self.routes.fetch(&run_round.path, self.service) {
            Ok(route) => route,
            Err(error) => {
                warn!(train = %self.train(used).name, %error, "run-round path unavailable, maneuver skipped");
                return;
            }
        };

        let used_train = self.train(used);
        let used_number = used_train.number;
        let used_subpath = if at_start {
            used_train.route.first_subpath()
        } else {
            used_train.route.last_subpath()
        };
        let reverse = match (used_subpath, route.first_subpath()) {
            (Some(from), Some(onto)) => formed_reverse(from, onto).unwrap_or_else(|| {
                warn!(train = %used_train.name, "run-round route shares no section with train route");
                false
            }),
            _ => false,
        };

        let number = self.alloc_number();
        let mut train = ScheduledTrain::new(number, format!("RR_{used_number:04}"), route);
        train.formed_of = Some(used_number);
        train.formed_of_kind = FormLink::Detached;
        train.attach_to = Some(attach_to);

        self.train_mut(used).detach_orders.push(DetachOrder {
            at_start,
            trigger_time: if at_start { run_round.time } else { None },
            formed_train: number,
            reverse,
        });
        self.trains.push(train);
    }

    fn synthesize_stable(&mut self, acting: TrainRef, stable: &StableDirective) {
        let acting_name = self.train(acting).name.clone();
        let acting_number = self.train(acting).number;

        // Resolve the final target first: a cycle whose target cannot be
        // linked is dropped whole.
        let final_target = match &stable.termination {
            StableTermination::Static => None,
            StableTermination::Forms(raw) | StableTermination::Triggers(raw) => {
                let name = normalize_target(raw, description_of(&acting_name));
                let Some(target) = self.find(&name) else {
                    warn!(train = %acting_name, target = %name, "stable target not found, cycle dropped");
                    return;
                };
                if target == acting {
                    warn!(train = %acting_name, "train cannot stable into itself, cycle dropped");
                    return;
                }
                if self.train(target).formed_of.is_some() {
                    warn!(
                        train = %acting_name,
                        target = %name,
                        "stable target already formed out of another train, cycle dropped"
                    );
                    return;
                }
                Some(target)
            }
        };

        let out_route = match self.routes.fetch(&stable.out_path, self.service) {
            Ok(route) => route,
            Err(error) => {
                warn!(train = %acting_name, %error, "stable outbound path unavailable, cycle dropped");
                return;
            }
        };
        let in_route = match (&stable.in_path, final_target) {
            (Some(path), Some(_)) => match self.routes.fetch(path, self.service) {
                Ok(route) => Some(route),
                Err(error) => {
                    warn!(train = %acting_name, %error, "stable inbound path unavailable, cycle dropped");
                    return;
                }
            },
            _ => None,
        };

        let out_number = self.alloc_number();
        let mut outbound = ScheduledTrain::new(out_number, format!("SO_{acting_number:04}"), out_route);
        outbound.start_time = stable.out_time;
        outbound.formed_of = Some(acting_number);
        outbound.formed_of_kind = FormLink::Formed;
        {
            let acting = self.train_mut(acting);
            acting.forms = Some(out_number);
            acting.set_stop = stable.set_stop;
        }

        let Some(target) = final_target else {
            // Stable to static: the parked consist never comes back.
            outbound.forms_static = true;
            self.train_mut(acting).forms_static = true;
            self.trains.push(outbound);
            return;
        };
        let Some(in_route) = in_route else {
            // Unreachable for a well-formed directive; the parser requires
            // in_path for a non-static termination.
            warn!(train = %acting_name, "stable cycle has no inbound route, cycle dropped");
            return;
        };

        let target_number = self.train(target).number;
        let in_number = self.alloc_number();
        let mut inbound = ScheduledTrain::new(in_number, format!("SI_{target_number:04}"), in_route);
        inbound.start_time = stable.in_time;
        inbound.formed_of = Some(out_number);
        inbound.formed_of_kind = match stable.termination {
            StableTermination::Triggers(_) => FormLink::Triggered,
            _ => FormLink::Formed,
        };
        inbound.forms = Some(target_number);
        inbound.set_stop = stable.set_stop;
        inbound.stable_call_on = stable.call_on;
        outbound.forms = Some(in_number);

        // The final target always counts as formed when reached through a
        // stable cycle; the nested kind only governs the inbound link.
        {
            let target_train = self.train_mut(target);
            target_train.formed_of = Some(in_number);
            target_train.formed_of_kind = FormLink::Formed;
        }

        // A triggered termination needs a physical consist on the inbound
        // leg, copied from the target in the orientation its route demands.
        if inbound.formed_of_kind == FormLink::Triggered && target_number != 0 {
            self.transfer_consist(&mut inbound, target, &acting_name);
        }

        let out_ref = TrainRef::Ai(self.trains.len());
        self.trains.push(outbound);
        let in_ref = TrainRef::Ai(self.trains.len());
        self.trains.push(inbound);

        if let Some(run_round) = &stable.run_round {
            // As with plain directives, a run-round only applies when the
            // cycle terminates in a formed train.
            if !matches!(stable.termination, StableTermination::Forms(_)) {
                warn!(train = %acting_name, "run-round only applies to a formed successor, ignored");
                return;
            }
            match run_round.position {
                RunRoundPosition::Out => {
                    self.synthesize_run_round(out_ref, out_number, true, run_round);
                }
                RunRoundPosition::In => {
                    self.synthesize_run_round(in_ref, target_number, false, run_round);
                }
                RunRoundPosition::Stable => {
                    self.synthesize_run_round(in_ref, in_number, true, run_round);
                }
            }
        }
    }

    fn transfer_consist(&self, inbound: &mut ScheduledTrain, target: TrainRef, acting_name: &str) {
        let target_train = self.train(target);
        let shared = match (
            inbound.route.last_subpath(),
            target_train.route.first_subpath(),
        ) {
            (Some(from), Some(onto)) => formed_reverse(from, onto),
            _ => None,
        };
        let Some(direct_reverse) = shared else {
            warn!(
                train = %acting_name,
                inbound = %inbound.name,
                "inbound and target routes share no section, consist not transferred"
            );
            return;
        };

        // The inbound route may itself flip the train an odd number of
        // times; the copy direction follows the combined parity.
        let total_reverse = inbound.route.valid_reversal_count() + usize::from(direct_reverse);
        let reversed = total_reverse % 2 == 1;
        inbound.cars = copy_cars(&target_train.cars, reversed);
        inbound.length_m = target_train.length_m;
    }
}

fn copy_cars(cars: &[CarDescriptor], reversed: bool) -> Vec<CarDescriptor> {
    if reversed {
        cars.iter()
            .rev()
            .map(|car| CarDescriptor {
                flipped: !car.flipped,
                ..car.clone()
            })
            .collect()
    } else {
        cars.to_vec()
    }
}

/// Normalize a dispose target reference into a full train name.
/// Handles `name` and `oldname=newname` forms and appends the acting
/// train's timetable description when the reference carries none.
fn normalize_target(raw: &str, description: &str) -> String {
    let name = raw.split_once('=').map_or(raw, |(_, after)| after);
    let name = name.split('/').next().unwrap_or(name).trim();
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{name}:{description}")
    }
}

fn description_of(train_name: &str) -> &str {
    train_name.split_once(':').map_or("", |(_, after)| after)
}
