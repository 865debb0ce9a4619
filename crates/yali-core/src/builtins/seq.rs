use crate::ast::{FnArity, Map, Value, Vector};
use crate::builtins::{as_index, def_builtin, err};
use crate::env::Env;
use crate::error::YaliError;
use crate::eval::Interpreter;

fn list_of(items: impl IntoIterator<Item = Value>) -> Value {
    Value::List(items.into_iter().collect())
}

fn as_map<'a>(name: &str, value: &'a Value) -> Result<Option<&'a Map>, YaliError> {
    match value {
        Value::Map(map) => Ok(Some(map)),
        Value::Nil => Ok(None),
        other => err(format!("{} expects a Map, got {}", name, other)),
    }
}

fn call(interp: &Interpreter, proc: &Value, args: Vec<Value>) -> Result<Value, YaliError> {
    interp.apply(proc, args)
}

fn count(interp: &Interpreter, value: &Value) -> Result<usize, YaliError> {
    Ok(match value {
        Value::Nil => 0,
        Value::List(list) => list.len(),
        Value::Map(map) => map.len(),
        Value::Str(text) => text.chars().count(),
        other => interp.iterate(other)?.len(),
    })
}

fn contains(interp: &Interpreter, coll: &Value, needle: &Value) -> Result<bool, YaliError> {
    if let Value::Map(map) = coll {
        return interp.map_contains(map, needle);
    }
    for item in interp.iterate(coll)? {
        if interp.values_equal(&item, needle)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn assoc(interp: &Interpreter, target: &Value, pairs: &[Value]) -> Result<Value, YaliError> {
    if pairs.len() % 2 != 0 {
        return err("assoc expects key/value pairs");
    }
    match target {
        Value::Nil | Value::Map(_) => {
            let mut map = match target {
                Value::Map(map) => map.clone(),
                _ => Map::default(),
            };
            for pair in pairs.chunks(2) {
                interp.map_insert(&mut map, pair[0].clone(), pair[1].clone())?;
            }
            Ok(Value::Map(map))
        }
        Value::List(list) => {
            let mut items = list.items().clone();
            for pair in pairs.chunks(2) {
                let idx = as_index("assoc", &pair[0])?;
                if idx < items.len() {
                    items[idx] = pair[1].clone();
                } else if idx == items.len() {
                    items.push_back(pair[1].clone());
                } else {
                    return Err(YaliError::runtime(format!(
                        "assoc index {} is out of range for a list of {} element(s)",
                        idx,
                        items.len()
                    )));
                }
            }
            Ok(Value::from(items))
        }
        other => err(format!("assoc expects a Map or List, got {}", other)),
    }
}

pub(crate) fn install(env: &mut Env) {
    def_builtin!(env, "get", FnArity::range(2, 3), |interp, args| {
        let found = interp.get(&args[0], &args[1])?;
        match (found, args.get(2)) {
            (Value::Nil, Some(default)) => Ok(default.clone()),
            (found, _) => Ok(found),
        }
    });
    def_builtin!(env, "count", FnArity::exact(1), |interp, args| {
        Ok(Value::Num(count(interp, &args[0])? as f64))
    });
    def_builtin!(env, "cons", FnArity::exact(2), |interp, args| {
        let mut items: Vector<Value> = interp.iterate(&args[1])?.into_iter().collect();
        items.push_front(args[0].clone());
        Ok(Value::from(items))
    });
    def_builtin!(env, "conj", FnArity::at_least(1), |interp, args| {
        match &args[0] {
            Value::Map(map) => {
                let mut map = map.clone();
                interp.insert_entries(&mut map, &args[1..])?;
                Ok(Value::Map(map))
            }
            Value::Nil => Ok(list_of(args[1..].iter().cloned())),
            other => {
                let mut items: Vector<Value> = interp.iterate(other)?.into_iter().collect();
                items.extend(args[1..].iter().cloned());
                Ok(Value::from(items))
            }
        }
    });
    def_builtin!(env, "concat", FnArity::at_least(0), |interp, args| {
        let mut items = Vector::new();
        for arg in args {
            items.extend(interp.iterate(arg)?);
        }
        Ok(Value::from(items))
    });
    def_builtin!(env, "assoc", FnArity::at_least(1), |interp, args| {
        assoc(interp, &args[0], &args[1..])
    });
    def_builtin!(env, "dissoc", FnArity::at_least(1), |interp, args| {
        let Some(map) = as_map("dissoc", &args[0])? else {
            return Ok(Value::Nil);
        };
        let mut map = map.clone();
        for key in &args[1..] {
            interp.map_remove(&mut map, key)?;
        }
        Ok(Value::Map(map))
    });
    def_builtin!(env, "keys", FnArity::exact(1), |_, args| {
        Ok(list_of(
            as_map("keys", &args[0])?
                .into_iter()
                .flat_map(|map| map.keys().cloned()),
        ))
    });
    def_builtin!(env, "vals", FnArity::exact(1), |_, args| {
        Ok(list_of(
            as_map("vals", &args[0])?
                .into_iter()
                .flat_map(|map| map.values().cloned()),
        ))
    });
    def_builtin!(env, "contains?", FnArity::exact(2), |interp, args| {
        Ok(Value::Bool(contains(interp, &args[0], &args[1])?))
    });
    def_builtin!(env, "nth", FnArity::range(2, 3), |interp, args| {
        let idx = as_index("nth", &args[1])?;
        match interp.iterate(&args[0])?.into_iter().nth(idx) {
            Some(item) => Ok(item),
            None => match args.get(2) {
                Some(default) => Ok(default.clone()),
                None => Err(YaliError::runtime(format!(
                    "nth index {} is out of range for {}",
                    idx, args[0]
                ))),
            },
        }
    });

    def_builtin!(env, "apply", FnArity::at_least(1), |interp, args| {
        let proc = interp.to_proc(&args[0])?;
        let mut call_args: Vec<Value> = Vec::new();
        if let Some((spread, fixed)) = args[1..].split_last() {
            call_args.extend(fixed.iter().cloned());
            call_args.extend(interp.iterate(spread)?);
        }
        call(interp, &proc, call_args)
    });
    def_builtin!(env, "map", FnArity::exact(2), |interp, args| {
        let proc = interp.to_proc(&args[0])?;
        let mut out = Vector::new();
        for item in interp.iterate(&args[1])? {
            out.push_back(call(interp, &proc, vec![item])?);
        }
        Ok(Value::from(out))
    });
    def_builtin!(env, "filter", FnArity::exact(2), |interp, args| {
        let proc = interp.to_proc(&args[0])?;
        let mut out = Vector::new();
        for item in interp.iterate(&args[1])? {
            if interp.truthy(&call(interp, &proc, vec![item.clone()])?)? {
                out.push_back(item);
            }
        }
        Ok(Value::from(out))
    });
    def_builtin!(env, "reduce", FnArity::exact(3), |interp, args| {
        let proc = interp.to_proc(&args[0])?;
        let mut acc = args[1].clone();
        for item in interp.iterate(&args[2])? {
            acc = call(interp, &proc, vec![acc, item])?;
        }
        Ok(acc)
    });
    def_builtin!(env, "for-each", FnArity::exact(2), |interp, args| {
        let proc = interp.to_proc(&args[0])?;
        let mut last = Value::Nil;
        for item in interp.iterate(&args[1])? {
            last = call(interp, &proc, vec![item])?;
        }
        Ok(last)
    });
    def_builtin!(env, "chunk", FnArity::exact(2), |interp, args| {
        let size = as_index("chunk", &args[0])?;
        if size == 0 {
            return err("chunk size must be positive");
        }
        let items = interp.iterate(&args[1])?;
        Ok(list_of(
            items.chunks(size).map(|part| list_of(part.iter().cloned())),
        ))
    });
    def_builtin!(env, "flatten", FnArity::exact(1), |interp, args| {
        let mut out = Vector::new();
        for item in interp.iterate(&args[0])? {
            out.extend(interp.iterate(&item)?);
        }
        Ok(Value::from(out))
    });
}
